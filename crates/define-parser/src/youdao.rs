//! Extraction of a `LexicalRecord` from a Youdao result page.
//!
//! Every section (phonetics, meanings, word groups, examples) is an
//! independent sub-parse over the result container: a missing section
//! yields an empty list and a malformed item inside a section is skipped.
//! Only the container and the headword are mandatory.

use define_core::{normalize_word, Example, LexicalRecord, Meaning, RecordBuilder, WordGroup};

use crate::error::{FailureKind, ParseFailure};
use crate::html::{collapse_whitespace, Document, NodeRef};

const CONTAINER_ID: &str = "results-contents";
const BASIC_ID: &str = "phrsListTab";
const COLLINS_ID: &str = "collinsResult";
const WORD_GROUP_ID: &str = "wordGroup";
const BILINGUAL_ID: &str = "bilingual";

/// Parse a raw result page.
pub fn parse(raw: &[u8]) -> Result<LexicalRecord, ParseFailure> {
    let source = String::from_utf8_lossy(raw);
    if source.trim().is_empty() {
        return Err(ParseFailure::new(FailureKind::EmptyInput, &source));
    }

    let doc = Document::parse(&source).map_err(|e| {
        ParseFailure::new(
            FailureKind::MalformedMarkup {
                position: e.position,
                message: e.message,
            },
            &source,
        )
    })?;

    let container = doc
        .root()
        .find(|n| n.has_id(CONTAINER_ID))
        .ok_or_else(|| ParseFailure::new(FailureKind::MissingContainer, &source))?;

    let word = match headword(container) {
        Some(word) => word,
        None => {
            let kind = match no_match_suggestions(container) {
                Some(suggestions) => FailureKind::NoMatch { suggestions },
                None => FailureKind::WordNotFound,
            };
            return Err(ParseFailure::new(kind, &source));
        }
    };

    let meanings = meanings(container);
    let mut builder = RecordBuilder::new(&word)
        .phonetics(phonetics(container))
        .word_groups(word_groups(container))
        .examples(examples(container));
    if meanings.is_empty() {
        tracing::debug!(word = %word, "no definition block produced a meaning");
        builder = builder.no_definitions();
    } else {
        builder = builder.meanings(meanings);
    }

    builder
        .build()
        .map_err(|e| ParseFailure::new(FailureKind::InvalidRecord(e), &source))
}

// ─── Headword / no-match ─────────────────────────────────────────

/// Basic header keyword first, then the Collins header's first span.
fn headword(container: NodeRef<'_>) -> Option<String> {
    let basic = container
        .find(|n| n.has_id(BASIC_ID))
        .and_then(|tab| tab.find(|n| n.has_class("keyword")))
        .map(|n| n.clean_text());

    let collins = || {
        container
            .find(|n| n.has_id(COLLINS_ID))
            .and_then(|c| c.find(|n| n.is_tag("h4")))
            .and_then(|h4| h4.find(|n| n.is_tag("span")))
            .map(|n| n.clean_text())
    };

    basic
        .filter(|w| !normalize_word(w).is_empty())
        .or_else(|| collins().filter(|w| !normalize_word(w).is_empty()))
}

/// `Some(suggestions)` when the page carries the "not found" markers.
fn no_match_suggestions(container: NodeRef<'_>) -> Option<Vec<String>> {
    let markers = container.find_all(|n| n.has_class("error-typo") || n.has_class("error-wrapper"));
    if markers.is_empty() {
        return None;
    }
    let mut suggestions: Vec<String> = Vec::new();
    for marker in markers.iter().filter(|m| m.has_class("error-typo")) {
        for link in marker.find_all(|n| n.is_tag("a")) {
            let text = link.clean_text();
            if !text.is_empty() && !suggestions.contains(&text) {
                suggestions.push(text);
            }
        }
    }
    Some(suggestions)
}

// ─── Phonetics ───────────────────────────────────────────────────

/// Every `.phonetic` in document order, duplicates kept.
fn phonetics(container: NodeRef<'_>) -> Vec<String> {
    container
        .find_all(|n| n.has_class("phonetic"))
        .into_iter()
        .map(|n| n.clean_text())
        .filter(|t| !t.is_empty())
        .collect()
}

// ─── Meanings ────────────────────────────────────────────────────

/// Collins blocks in document order, first non-empty wins; the basic
/// translation list is the fallback.
fn meanings(container: NodeRef<'_>) -> Vec<Meaning> {
    if let Some(collins) = container.find(|n| n.has_id(COLLINS_ID)) {
        let mut blocks = collins.find_all(|n| n.has_class("wt-container"));
        if blocks.is_empty() {
            blocks.push(collins);
        }
        for block in blocks {
            let found = collins_block(block);
            if !found.is_empty() {
                return found;
            }
        }
    }

    container
        .find(|n| n.has_id(BASIC_ID))
        .into_iter()
        .flat_map(|tab| tab.find_all(|n| n.has_class("trans-container")))
        .map(basic_block)
        .find(|found| !found.is_empty())
        .unwrap_or_default()
}

fn collins_block(block: NodeRef<'_>) -> Vec<Meaning> {
    block
        .find_all(|n| n.is_tag("li"))
        .into_iter()
        .filter_map(|li| {
            let meaning = collins_item(li);
            if meaning.is_none() {
                tracing::debug!(node = li.id(), "skipping malformed Collins item");
            }
            meaning
        })
        .collect()
}

/// One Collins `li`: the first `div` holds `<p><span>POS</span> text</p>`,
/// later leaf `div`s hold example sentence pairs.
fn collins_item(li: NodeRef<'_>) -> Option<Meaning> {
    let divs = li.find_all(|n| n.is_tag("div"));
    let (main, rest) = divs.split_first()?;
    let p = main.find(|n| n.is_tag("p"))?;

    let mut part_of_speech: Option<String> = None;
    let mut seen_span = false;
    let mut pieces: Vec<String> = Vec::new();
    for child in p.children() {
        if child.is_tag("span") {
            if !seen_span {
                part_of_speech = Some(child.clean_text()).filter(|s| !s.is_empty());
                seen_span = true;
            }
            continue;
        }
        if !seen_span {
            continue;
        }
        let piece = match child.name() {
            Some("b") => {
                let inner = child.clean_text();
                if inner.is_empty() {
                    continue;
                }
                format!("<b>{}</b>", inner)
            }
            _ => child.clean_text(),
        };
        if !piece.is_empty() {
            pieces.push(piece);
        }
    }

    if !seen_span || pieces.is_empty() {
        return None;
    }

    let examples = rest
        .iter()
        .filter(|div| div.find(|n| n.is_tag("div")).is_none())
        .filter_map(|div| sentence_pair(*div))
        .collect();

    Some(Meaning::new(part_of_speech, pieces.join(" ")).with_examples(examples))
}

fn basic_block(block: NodeRef<'_>) -> Vec<Meaning> {
    block
        .find_all(|n| n.is_tag("li"))
        .into_iter()
        .filter_map(|li| {
            let text = li.clean_text();
            if text.is_empty() {
                return None;
            }
            let (part_of_speech, definition) = split_part_of_speech(&text);
            Some(Meaning::new(part_of_speech, definition))
        })
        .collect()
}

/// `"n. greeting"` → `(Some("n."), "greeting")`. Anything that does not
/// start with a dotted abbreviation keeps its full text as the definition.
fn split_part_of_speech(text: &str) -> (Option<String>, String) {
    if let Some((head, tail)) = text.split_once(' ') {
        let tail = tail.trim();
        let is_abbreviation = head.len() > 1
            && head.ends_with('.')
            && head
                .chars()
                .all(|c| c.is_ascii_alphabetic() || c == '.' || c == '&');
        if is_abbreviation && !tail.is_empty() {
            return (Some(head.to_string()), tail.to_string());
        }
    }
    (None, text.to_string())
}

// ─── Word groups / examples ──────────────────────────────────────

fn word_groups(container: NodeRef<'_>) -> Vec<WordGroup> {
    let Some(section) = container.find(|n| n.has_id(WORD_GROUP_ID)) else {
        return Vec::new();
    };
    section
        .find_all(|n| n.is_tag("p") && n.has_class("wordGroup"))
        .into_iter()
        .filter_map(|p| {
            let title = p.find(|n| n.has_class("contentTitle"))?;
            let phrase = title.clean_text();
            let translation: String = p
                .children()
                .filter(|c| c.id() != title.id() && c.find(|n| n.id() == title.id()).is_none())
                .map(|c| c.text())
                .collect();
            let translation = collapse_whitespace(&translation);
            if phrase.is_empty() || translation.is_empty() {
                tracing::debug!(node = p.id(), "skipping incomplete word group");
                return None;
            }
            Some(WordGroup::new(phrase, translation))
        })
        .collect()
}

fn examples(container: NodeRef<'_>) -> Vec<Example> {
    let Some(section) = container.find(|n| n.has_id(BILINGUAL_ID)) else {
        return Vec::new();
    };
    section
        .find_all(|n| n.is_tag("li"))
        .into_iter()
        .filter_map(sentence_pair)
        .collect()
}

/// First two `p` below `node` as (sentence, translation).
fn sentence_pair(node: NodeRef<'_>) -> Option<Example> {
    let ps = node.find_all(|n| n.is_tag("p"));
    if ps.len() < 2 {
        return None;
    }
    let sentence = ps[0].clean_text();
    let translation = ps[1].clean_text();
    if sentence.is_empty() {
        return None;
    }
    Some(Example::new(sentence, translation))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_PAGE: &str = r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>hello - 有道词典</title>
<script type="text/javascript">var x = 1 < 2 && "</div>";</script>
</head>
<body>
<div id="results-contents" class="results-content">
  <div id="phrsListTab" class="trans-wrapper clearfix">
    <h2 class="wordbook-js">
      <span class="keyword">Hello</span>
      <div class="baav">
        <span class="pronounce">英<span class="phonetic">[həˈləʊ]</span></span>
        <span class="pronounce">美<span class="phonetic">[həˈloʊ]</span></span>
      </div>
    </h2>
    <div class="trans-container">
      <ul>
        <li>int. 喂；哈罗</li>
        <li>n. 表示问候， 惊奇或唤起注意时的用语</li>
      </ul>
    </div>
  </div>
  <div id="collinsResult" class="tab-content">
    <div class="wt-container">
      <h4><span class="title">hello</span><em class="additional spell phonetic">/hɛˈləʊ/</em></h4>
      <ul class="ol">
        <li>
          <span class="collinsOrder">1.</span>
          <div class="collinsMajorTrans">
            <p><span class="additional">CONVENTION</span> You say '<b>hello</b>' to someone when you meet them. <span class="additional">喂；你好</span></p>
          </div>
          <div class="exampleLists">
            <span class="collinsOrder">例：</span>
            <div class="examples">
              <p>Hello, Trish.</p>
              <p>你好，特丽斯。</p>
            </div>
          </div>
        </li>
        <li>
          <div class="collinsMajorTrans">
            <p><span class="additional">CONVENTION</span> You say '<b>hello</b>' to attract attention.</p>
          </div>
        </li>
        <li>
          <div class="collinsMajorTrans"><p>no category span here</p></div>
        </li>
      </ul>
    </div>
    <div class="wt-container">
      <ul class="ol">
        <li><div><p><span>N-COUNT</span> a later block</p></div></li>
      </ul>
    </div>
  </div>
  <div id="wordGroup" class="trans-container tab-content">
    <p class="wordGroup"><span class="contentTitle"><a class="search-js" href="/w/hello world">hello world</a></span>你好世界</p>
    <p class="wordGroup"><span class="contentTitle"><a href="#">say hello</a></span> 打招呼；问好</p>
    <p class="wordGroup"><span class="contentTitle"><a href="#">orphan</a></span></p>
  </div>
  <div id="bilingual" class="trans-container tab-content">
    <ul class="ol">
      <li><p><span>Hello</span>, <span>Bob</span>.</p><p>你好，鲍勃。</p><p class="example-via">来自《柯林斯》</p></li>
      <li><p>Only one paragraph.</p></li>
    </ul>
  </div>
</div>
</body>
</html>"##;

    const NO_MATCH_PAGE: &str = r#"<html><body>
<div id="results-contents">
  <div class="error-wrapper">
    <div class="error-typo">
      <h4>您要找的是不是：</h4>
      <p class="typo-rel"><span class="title"><a href="/w/hello">hello</a></span>int. 喂</p>
      <p class="typo-rel"><span class="title"><a href="/w/hallo">hallo</a></span>int. 喂</p>
    </div>
  </div>
</div>
</body></html>"#;

    #[test]
    fn parses_full_page() {
        let record = parse(HELLO_PAGE.as_bytes()).unwrap();
        assert_eq!(record.word(), "hello");
        assert!(!record.no_definitions());
        assert_eq!(
            record.phonetics(),
            ["[həˈləʊ]", "[həˈloʊ]", "/hɛˈləʊ/"].map(String::from)
        );
    }

    #[test]
    fn first_collins_block_wins_in_document_order() {
        let record = parse(HELLO_PAGE.as_bytes()).unwrap();
        let meanings = record.meanings();
        assert_eq!(meanings.len(), 2, "malformed item skipped, later block ignored");
        assert_eq!(meanings[0].part_of_speech.as_deref(), Some("CONVENTION"));
        assert_eq!(
            meanings[0].definition,
            "You say ' <b>hello</b> ' to someone when you meet them."
        );
        assert_eq!(meanings[1].definition, "You say ' <b>hello</b> ' to attract attention.");
    }

    #[test]
    fn collins_examples_come_from_leaf_divs_only() {
        let record = parse(HELLO_PAGE.as_bytes()).unwrap();
        let examples = &record.meanings()[0].examples;
        assert_eq!(examples, &vec![Example::new("Hello, Trish.", "你好，特丽斯。")]);
        assert!(record.meanings()[1].examples.is_empty());
    }

    #[test]
    fn word_groups_and_examples() {
        let record = parse(HELLO_PAGE.as_bytes()).unwrap();
        assert_eq!(
            record.word_groups(),
            [
                WordGroup::new("hello world", "你好世界"),
                WordGroup::new("say hello", "打招呼；问好"),
            ]
        );
        assert_eq!(record.examples(), [Example::new("Hello, Bob.", "你好，鲍勃。")]);
    }

    #[test]
    fn basic_block_is_fallback_without_collins() {
        let page = HELLO_PAGE.replace("collinsResult", "somethingElse");
        let record = parse(page.as_bytes()).unwrap();
        let meanings = record.meanings();
        assert_eq!(meanings.len(), 2);
        assert_eq!(meanings[0].part_of_speech.as_deref(), Some("int."));
        assert_eq!(meanings[0].definition, "喂；哈罗");
        assert_eq!(meanings[1].part_of_speech.as_deref(), Some("n."));
        assert_eq!(meanings[1].definition, "表示问候， 惊奇或唤起注意时的用语");
    }

    #[test]
    fn missing_optional_sections_yield_empty_lists() {
        let page = r#"<div id="results-contents">
            <div id="phrsListTab"><span class="keyword">dog</span>
              <div class="trans-container"><ul><li>n. 狗</li></ul></div>
            </div></div>"#;
        let record = parse(page.as_bytes()).unwrap();
        assert_eq!(record.word(), "dog");
        assert_eq!(record.meanings().len(), 1);
        assert!(record.phonetics().is_empty());
        assert!(record.word_groups().is_empty());
        assert!(record.examples().is_empty());
    }

    #[test]
    fn headword_without_definitions_is_marked() {
        let page = r#"<div id="results-contents"><div id="phrsListTab"><span class="keyword">xyzzy</span></div></div>"#;
        let record = parse(page.as_bytes()).unwrap();
        assert!(record.no_definitions());
        assert!(record.meanings().is_empty());
    }

    #[test]
    fn bare_less_than_in_definition_is_kept() {
        let page = r#"<div id="results-contents"><div id="phrsListTab"><span class="keyword">less</span>
            <div class="trans-container"><ul><li>adj. 1 < 2 更少的</li><li>n. 较少</li></ul></div>
            </div></div>"#;
        let record = parse(page.as_bytes()).unwrap();
        let meanings = record.meanings();
        assert_eq!(meanings.len(), 2);
        assert_eq!(meanings[0].part_of_speech.as_deref(), Some("adj."));
        assert_eq!(meanings[0].definition, "1 < 2 更少的");
    }

    #[test]
    fn uppercase_markup_is_recognized() {
        let page = r#"<DIV ID="results-contents"><DIV ID="phrsListTab"><SPAN CLASS="keyword">Dog</SPAN>
            <DIV CLASS="trans-container"><UL><LI>n. 狗</LI></UL></DIV></DIV></DIV>"#;
        let record = parse(page.as_bytes()).unwrap();
        assert_eq!(record.word(), "dog");
        assert_eq!(record.meanings()[0].definition, "狗");
    }

    #[test]
    fn collins_header_supplies_word_when_basic_missing() {
        let page = r#"<div id="results-contents"><div id="collinsResult">
            <h4><span class="title">Serendipity</span></h4>
            <ul><li><div><p><span>N-UNCOUNT</span> luck in finding things</p></div></li></ul>
        </div></div>"#;
        let record = parse(page.as_bytes()).unwrap();
        assert_eq!(record.word(), "serendipity");
        assert_eq!(record.meanings()[0].definition, "luck in finding things");
    }

    #[test]
    fn no_match_page_reports_suggestions() {
        let failure = parse(NO_MATCH_PAGE.as_bytes()).unwrap_err();
        assert_eq!(
            failure.kind,
            FailureKind::NoMatch {
                suggestions: vec!["hello".into(), "hallo".into()]
            }
        );
    }

    #[test]
    fn missing_container_fails() {
        let failure = parse(b"<html><body><p>maintenance</p></body></html>").unwrap_err();
        assert_eq!(failure.kind, FailureKind::MissingContainer);
        assert!(failure.raw_snippet.starts_with("<html>"));
    }

    #[test]
    fn container_without_headword_fails() {
        let failure = parse(br#"<div id="results-contents"><p>nothing</p></div>"#).unwrap_err();
        assert_eq!(failure.kind, FailureKind::WordNotFound);
    }

    #[test]
    fn empty_and_garbage_inputs_fail_without_panicking() {
        assert_eq!(parse(b"").unwrap_err().kind, FailureKind::EmptyInput);
        assert_eq!(parse(b"  \n\t").unwrap_err().kind, FailureKind::EmptyInput);

        let garbage: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        assert!(parse(&garbage).is_err());
        assert!(parse(&[0xff, 0xfe, 0x00, b'<', b'>']).is_err());
    }

    #[test]
    fn truncated_inputs_fail_without_panicking() {
        for cut in (0..HELLO_PAGE.len()).step_by(97) {
            if !HELLO_PAGE.is_char_boundary(cut) {
                continue;
            }
            // Any outcome is fine as long as it is a value, not a panic.
            let _ = parse(HELLO_PAGE[..cut].as_bytes());
        }
        let cut = HELLO_PAGE.find("<div id=\"results-contents\"").unwrap() + 10;
        assert!(parse(HELLO_PAGE[..cut].as_bytes()).is_err());
    }

    #[test]
    fn split_part_of_speech_cases() {
        assert_eq!(split_part_of_speech("n. 狗"), (Some("n.".into()), "狗".into()));
        assert_eq!(split_part_of_speech("vt.&vi. 跑"), (Some("vt.&vi.".into()), "跑".into()));
        assert_eq!(split_part_of_speech("【名】 狗"), (None, "【名】 狗".into()));
        assert_eq!(split_part_of_speech("n."), (None, "n.".into()));
        assert_eq!(split_part_of_speech("e.g. this"), (Some("e.g.".into()), "this".into()));
    }
}
