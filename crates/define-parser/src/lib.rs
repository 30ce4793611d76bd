//! Response parser: raw Youdao result page in, `LexicalRecord` out.
//!
//! `parse` is pure and never panics on malformed input; anything it cannot
//! interpret comes back as a `ParseFailure` with a diagnostic reason.

pub mod error;
pub mod html;
pub mod youdao;

pub use error::{FailureKind, ParseFailure};
pub use youdao::parse;
