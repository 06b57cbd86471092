//! Parser to normalize HTML.
//!
//! A minimal SAX echo: re-emits every event deterministically, so two
//! serializations of equivalent markup can be compared byte for byte.
use super::sax::{self, SaxHandler};
use super::tag::Tag;
use super::utils;

use crate::error::Error;

#[derive(Debug, Default)]
pub struct Normalizer {
    html: String,
    tags: Vec<Tag>,
}

impl Normalizer {
    pub fn new() -> Normalizer {
        Normalizer::default()
    }

    pub fn feed(&mut self, html: &str) -> Result<(), Error> {
        sax::run(html, self)
    }

    pub fn get_html(&self) -> &str {
        &self.html
    }
}

impl SaxHandler for Normalizer {
    fn on_open_tag(&mut self, tag: Tag) -> Result<(), Error> {
        self.html.push_str(&utils::get_open_tag_html(&tag));
        self.tags.push(tag);
        Ok(())
    }

    fn on_close_tag(&mut self, tag_name: &str) -> Result<(), Error> {
        let tag = self.tags.pop().filter(|tag| tag.name() == tag_name);
        let tag = tag.ok_or_else(|| {
            Error::MalformedInput(format!("unmatched close tag: {}", tag_name))
        })?;
        self.html.push_str(&utils::get_close_tag_html(&tag));
        Ok(())
    }

    fn on_text(&mut self, text: &str) -> Result<(), Error> {
        self.html.push_str(&utils::esc(text));
        Ok(())
    }
}
