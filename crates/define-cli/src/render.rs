//! Terminal rendering of lookup results.
//!
//! Everything renders into a `String` so the binary decides where it goes.

use std::fmt::Write;

use colored::Colorize;
use define_core::LexicalRecord;
use define_parser::{FailureKind, ParseFailure};

const PHONETIC_GAP: &str = "        ";

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Show examples, word groups and failure snippets.
    pub verbose: bool,
    /// Print at most this many meanings.
    pub max_meanings: Option<usize>,
}

pub fn render_record(record: &LexicalRecord, options: &RenderOptions) -> String {
    let mut out = String::new();

    let _ = write!(out, "{}", record.word().bold().red());
    if !record.phonetics().is_empty() {
        let _ = write!(out, "{}{}", PHONETIC_GAP, record.phonetics().join(" "));
    }
    out.push('\n');

    if record.no_definitions() {
        let _ = writeln!(out, "{}", "(no definitions)".dimmed());
    }

    let limit = options.max_meanings.unwrap_or(usize::MAX);
    for (i, meaning) in record.meanings().iter().take(limit).enumerate() {
        let _ = write!(out, "{}. ", i + 1);
        if let Some(pos) = &meaning.part_of_speech {
            let _ = write!(out, "({}) ", pos);
        }
        out.push_str(&highlight(&meaning.definition));
        out.push('\n');

        if options.verbose {
            for example in &meaning.examples {
                let _ = writeln!(out, "    - {}", highlight(&example.sentence));
                let _ = writeln!(out, "      {}", example.translation);
            }
        }
    }

    if options.verbose {
        if !record.word_groups().is_empty() {
            let _ = writeln!(out, "\n{}", "Word groups".bold());
            for group in record.word_groups() {
                let _ = writeln!(out, "    {}  {}", group.phrase.cyan(), group.translation);
            }
        }
        if !record.examples().is_empty() {
            let _ = writeln!(out, "\n{}", "Examples".bold());
            for (i, example) in record.examples().iter().enumerate() {
                let _ = writeln!(out, "    {}. {}", i + 1, example.sentence);
                let _ = writeln!(out, "       {}", example.translation);
            }
        }
    }

    out
}

pub fn render_failure(word: &str, failure: &ParseFailure, options: &RenderOptions) -> String {
    let mut out = String::new();

    match &failure.kind {
        FailureKind::NoMatch { .. } => {
            let _ = writeln!(out, "{} {}", "Not found:".red().bold(), word);
        }
        kind => {
            let _ = writeln!(out, "{} {} ({})", "Not found:".red().bold(), word, kind);
        }
    }

    if !failure.suggestions().is_empty() {
        let _ = writeln!(out, "Did you mean: {}", failure.suggestions().join(", ").yellow());
    }

    if options.verbose && !failure.raw_snippet.is_empty() {
        let _ = writeln!(out, "{}", "Response began with:".dimmed());
        let _ = writeln!(out, "{}", failure.raw_snippet);
    }

    out
}

/// Replace `<b>…</b>` markers with terminal emphasis. An unclosed marker
/// emphasizes the rest of the text.
fn highlight(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find("<b>") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 3..];
        let (inner, next) = match after.find("</b>") {
            Some(close) => (&after[..close], &after[close + 4..]),
            None => (after, ""),
        };
        let _ = write!(out, "{}", inner.bold().red());
        rest = next;
    }
    out.push_str(rest);
    out
}
