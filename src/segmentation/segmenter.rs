//! Segmenter adapter: turns a sentence splitter into validated boundary
//! offsets and drives [Doc::segment].
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::error::Error;
use crate::lineardoc::Doc;

/// The injected per-language splitter seam: plaintext in, sentences out.
/// Sentences are returned as slices of the input so boundary offsets can be
/// recovered exactly.
pub trait SentenceSplitter {
    fn split<'a>(&self, text: &'a str) -> Vec<&'a str>;
}

lazy_static! {
    // a sentence terminator, optional closing quotes or brackets, then the
    // whitespace run a new sentence starts after
    static ref BOUNDARY: Regex = Regex::new(r#"[.!?…][\"'”’»)\]]*\s+"#).unwrap();
}

/// Abbreviations that end in a period without ending a sentence.
const ABBREVIATIONS: &[&str] = &["mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "no", "vs"];

/// Rule-based splitter for Latin-script languages. Splits after
/// terminator-plus-whitespace, keeping single-letter initials and a few
/// common abbreviations attached to their sentence.
#[derive(Debug, Default)]
pub struct RuleSplitter;

impl RuleSplitter {
    fn is_false_boundary(text: &str, terminator_at: usize) -> bool {
        if text.as_bytes().get(terminator_at) != Some(&b'.') {
            return false;
        }
        let word = text[..terminator_at]
            .rsplit(|c: char| c.is_whitespace())
            .next()
            .unwrap_or("");
        if word.chars().count() == 1 && word.chars().all(|c| c.is_uppercase()) {
            // a single-letter initial, "J. K. Rowling"
            return true;
        }
        ABBREVIATIONS.contains(&word.to_lowercase().as_str())
    }
}

impl SentenceSplitter for RuleSplitter {
    fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut sentences = Vec::new();
        let mut start = 0usize;
        for found in BOUNDARY.find_iter(text) {
            if Self::is_false_boundary(text, found.start()) {
                continue;
            }
            sentences.push(&text[start..found.end()]);
            start = found.end();
        }
        if start < text.len() {
            sentences.push(&text[start..]);
        }
        sentences
    }
}

/// Sentence segmenter for one source language.
pub struct CxSegmenter {
    splitter: Box<dyn SentenceSplitter>,
}

impl CxSegmenter {
    /// Per-language splitter libraries plug in through [Self::with_splitter];
    /// the rule splitter is the stand-in for every language until then.
    pub fn for_language(language: &str) -> CxSegmenter {
        debug!("using the rule splitter for {}", language);
        CxSegmenter::with_splitter(Box::new(RuleSplitter))
    }

    pub fn with_splitter(splitter: Box<dyn SentenceSplitter>) -> CxSegmenter {
        CxSegmenter { splitter }
    }

    /// Byte offsets at which a new sentence begins, located by walking the
    /// splitter's sentences through the text with a moving cursor (some
    /// splitters re-search substrings and report duplicates on repeated
    /// text, so the result is validated and de-duplicated).
    pub fn boundaries(&self, text: &str) -> Result<Vec<usize>, Error> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let mut boundaries = Vec::new();
        let mut cursor = 0usize;
        for sentence in self.splitter.split(text) {
            if sentence.trim().is_empty() {
                continue;
            }
            if let Some(found) = text[cursor..].find(sentence) {
                let at = cursor + found;
                boundaries.push(at);
                cursor = at + sentence.len();
            }
        }
        validate_boundaries(boundaries, text)
    }

    pub fn segment(&self, doc: &Doc) -> Result<Doc, Error> {
        doc.segment(&|text: &str| self.boundaries(text))
    }
}

/// Sort and de-duplicate boundary offsets; offsets past the end of the text
/// or inside a character are the segmenter library misbehaving.
pub fn validate_boundaries(mut boundaries: Vec<usize>, text: &str) -> Result<Vec<usize>, Error> {
    boundaries.sort_unstable();
    boundaries.dedup();
    if let Some(&last) = boundaries.last() {
        if last > text.len() {
            return Err(Error::Segmenter(format!(
                "boundary {} beyond plaintext length {}",
                last,
                text.len()
            )));
        }
    }
    if let Some(&bad) = boundaries.iter().find(|&&b| !text.is_char_boundary(b)) {
        return Err(Error::Segmenter(format!(
            "boundary {} is not on a character boundary",
            bad
        )));
    }
    Ok(boundaries)
}
