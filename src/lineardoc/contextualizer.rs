//! Segmentation-context tracking for the parser.
//!
//! A contextualizer keeps a stack of contexts parallel to the parser's open
//! tags: a tag's context is decided when it opens and is inherited by every
//! descendant until it closes. The stacks move together; the contextualizer
//! is a collaborator the parser calls, not part of the parser itself.
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use super::tag::Tag;
use super::utils;

use crate::config::RemovableRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Removable,
    Media,
    MediaInline,
    Verbatim,
    Section,
    ContentBranch,
}

pub trait Contextualize {
    fn on_open(&mut self, tag: &Tag);
    fn on_close(&mut self);
    fn context(&self) -> Option<Context>;
    fn can_segment(&self) -> bool;
    fn is_removable(&mut self, tag: &Tag) -> bool;
}

/// Contextualizer for plain HTML.
#[derive(Debug, Default)]
pub struct Contextualizer {
    contexts: Vec<Option<Context>>,
}

impl Contextualizer {
    pub fn new() -> Contextualizer {
        Contextualizer::default()
    }

    fn child_context(&self, tag: &Tag) -> Option<Context> {
        match tag.name() {
            "figure" => Some(Context::Media),
            "figcaption" => None,
            _ => self.context(),
        }
    }
}

impl Contextualize for Contextualizer {
    fn on_open(&mut self, tag: &Tag) {
        let child = self.child_context(tag);
        self.contexts.push(child);
    }

    fn on_close(&mut self) {
        self.contexts.pop();
    }

    fn context(&self) -> Option<Context> {
        self.contexts.last().copied().flatten()
    }

    fn can_segment(&self) -> bool {
        self.context().is_none()
            && !self.contexts.iter().any(|context| {
                matches!(
                    context,
                    Some(Context::Removable) | Some(Context::Verbatim) | Some(Context::Media)
                )
            })
    }

    fn is_removable(&mut self, _tag: &Tag) -> bool {
        false
    }
}

lazy_static! {
    static ref TRANSCLUSION_TYPE: Regex =
        Regex::new(r"(^|\s)(mw:Transclusion|mw:Placeholder)\b").unwrap();
    static ref MEDIA_TYPE: Regex =
        Regex::new(r"(^|\s)(mw:File|mw:Image|mw:Video|mw:Audio)\b").unwrap();
}

/// Nodes that carry flowing content and may be segmented into sentences.
const CONTENT_BRANCH_NODES: &[&str] = &[
    "blockquote",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "p",
    "pre",
    "div",
    "table",
    "ol",
    "ul",
    "dl",
    "figure",
    "center",
    "section",
];

/// Contextualizer for MediaWiki DOM HTML.
#[derive(Debug)]
pub struct MwContextualizer {
    contexts: Vec<Option<Context>>,
    rules: Arc<RemovableRules>,
    /// `about` values of removed transclusions: their fragments go too.
    removable_fragments: Vec<String>,
}

impl MwContextualizer {
    pub fn new(rules: Arc<RemovableRules>) -> MwContextualizer {
        MwContextualizer {
            contexts: Vec::new(),
            rules,
            removable_fragments: Vec::new(),
        }
    }

    fn child_context(&mut self, tag: &Tag) -> Option<Context> {
        let context = self.context();
        if context == Some(Context::Removable) || self.is_removable(tag) {
            return Some(Context::Removable);
        }

        let tag_type = tag
            .attr("typeof")
            .filter(|t| !t.is_empty())
            .or_else(|| tag.attr("rel"))
            .unwrap_or_default();

        // Every descendant of a transclusion or placeholder is verbatim
        if context == Some(Context::Verbatim) || TRANSCLUSION_TYPE.is_match(&tag_type) {
            return Some(Context::Verbatim);
        }

        if tag.name() == "figure" {
            return Some(Context::Media);
        }

        if tag.name() == "span" && MEDIA_TYPE.is_match(&tag_type) {
            return Some(Context::MediaInline);
        }

        // Immediate children of body are sections
        if context.is_none() && tag.name() == "body" {
            return Some(Context::Section);
        }

        if matches!(context, Some(Context::Media) | Some(Context::MediaInline))
            && tag.name() == "figcaption"
        {
            return Some(Context::ContentBranch);
        }

        if matches!(context, Some(Context::Section) | None)
            && CONTENT_BRANCH_NODES.contains(&tag.name())
        {
            return Some(Context::ContentBranch);
        }

        context
    }

    fn template_is_removable(&self, tag: &Tag) -> bool {
        let data_mw = match tag.attr("data-mw") {
            Some(data_mw) => data_mw,
            None => return false,
        };
        // a broken data-mw blob is not ours to police
        let value: serde_json::Value = match serde_json::from_str(&data_mw) {
            Ok(value) => value,
            Err(_) => return false,
        };
        let parts = match value.get("parts").and_then(|p| p.as_array()) {
            Some(parts) => parts,
            None => return false,
        };
        parts.iter().any(|part| {
            part.get("template")
                .and_then(|t| t.get("target"))
                .and_then(|t| t.get("href"))
                .and_then(|h| h.as_str())
                .map(|href| {
                    // hrefs spell spaces as underscores; rule names do not
                    let name = href
                        .trim_start_matches("./")
                        .trim_start_matches("Template:")
                        .replace('_', " ");
                    self.rules.matches_template(&name)
                })
                .unwrap_or(false)
        })
    }
}

impl Contextualize for MwContextualizer {
    fn on_open(&mut self, tag: &Tag) {
        let child = self.child_context(tag);
        self.contexts.push(child);
    }

    fn on_close(&mut self) {
        self.contexts.pop();
    }

    fn context(&self) -> Option<Context> {
        self.contexts.last().copied().flatten()
    }

    fn can_segment(&self) -> bool {
        self.context() == Some(Context::ContentBranch)
    }

    fn is_removable(&mut self, tag: &Tag) -> bool {
        if self.rules.is_empty() {
            return false;
        }

        let about = tag.attr("about");
        if let Some(about) = &about {
            if self.removable_fragments.contains(about) {
                return true;
            }
        }

        let removable = tag
            .attr_tokens("class")
            .iter()
            .any(|class| self.rules.has_class(class))
            || tag
                .attr_tokens("typeof")
                .iter()
                .any(|value| self.rules.has_rdfa(value))
            || (utils::is_transclusion(tag) && self.template_is_removable(tag));

        if removable {
            if let Some(about) = about {
                if !self.removable_fragments.contains(&about) {
                    self.removable_fragments.push(about);
                }
            }
        }
        removable
    }
}
