//! Orchestrator wiring the pipeline: parse, wrap sections, segment,
//! serialize.
use std::sync::Arc;

use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;

use crate::config::{PrepConfig, RemovableRules};
use crate::error::Error;
use crate::lineardoc::{MwContextualizer, Normalizer, Parser, ParserOptions};
use crate::segmentation::CxSegmenter;

/// Fixed phrase the service surface reports for empty requests.
pub const EMPTY_INPUT_MESSAGE: &str = "Content for translate is not given or is empty";

/// One processor per service; removable rules are compiled once and shared
/// read-only across requests.
pub struct Processor {
    rules: Arc<RemovableRules>,
}

impl Processor {
    pub fn new(config: &PrepConfig) -> Result<Processor, Error> {
        let rules = RemovableRules::compile(&config.removable_sections)?;
        Ok(Processor {
            rules: Arc::new(rules),
        })
    }

    /// Run the full preparation pipeline over one Parsoid document.
    pub fn process(&self, html: &str, language: &str) -> Result<String, Error> {
        if html.trim().is_empty() {
            return Err(Error::Custom(EMPTY_INPUT_MESSAGE.to_string()));
        }

        let contextualizer = MwContextualizer::new(self.rules.clone());
        let mut parser = Parser::new(contextualizer, ParserOptions::default());
        parser.feed(html)?;
        let doc = parser.into_doc();
        debug!("parsed {} bytes into {} items", html.len(), doc.items().len());

        let doc = doc.wrap_sections();
        let segmenter = CxSegmenter::for_language(language);
        let doc = segmenter.segment(&doc)?;

        let result = doc.get_html();
        info!(
            "processed {} bytes of html into {} bytes",
            html.len(),
            result.len()
        );
        Ok(result)
    }
}

lazy_static! {
    static ref LINE_NOISE: Regex = Regex::new(r"[\t\r\n]+").unwrap();
}

/// Parse and re-serialize deterministically, with tabs and newlines
/// stripped first. Used for byte-equality comparisons.
pub fn normalize(html: &str) -> Result<String, Error> {
    let html = LINE_NOISE.replace_all(html, "");
    let mut normalizer = Normalizer::new();
    normalizer.feed(&html)?;
    Ok(normalizer.get_html().to_string())
}
