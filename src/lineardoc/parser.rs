//! Parser reading an HTML stream into a [Doc].
use log::warn;

use super::builder::Builder;
use super::chunk::InlineContent;
use super::contextualizer::{Context, Contextualize};
use super::doc::Doc;
use super::sax::{self, SaxHandler};
use super::tag::{Tag, TagRef};
use super::utils;

use crate::error::Error;

/// Tags that are always block level; everything else is an inline
/// annotation, with a few context-dependent exceptions.
const BLOCK_TAGS: &[&str] = &[
    "html", "head", "body", "script",
    // head tags
    // In HTML5+RDFa, link/meta are actually allowed anywhere in the body, and are to be
    // treated as void flow content (like <br> and <img>).
    "title", "style", "meta", "link", "noscript", "base",
    // non-visual content
    "audio", "data", "datagrid", "datalist", "dialog", "eventsource", "form",
    "iframe", "main", "menu", "menuitem", "optgroup", "option",
    // paragraph
    "div", "p",
    // tables
    "table", "tbody", "thead", "tfoot", "caption", "th", "tr", "td",
    // lists
    "ul", "ol", "li", "dl", "dt", "dd",
    // HTML5 heading content
    "h1", "h2", "h3", "h4", "h5", "h6", "hgroup",
    // HTML5 sectioning content
    "article", "aside", "nav", "section", "footer", "header", "figure",
    "figcaption", "fieldset", "details", "blockquote",
    // other
    "hr", "button", "canvas", "center", "col", "colgroup", "embed",
    "map", "object", "pre", "progress", "video",
    // non-annotation inline tags
    "img", "br",
    "wiki-chart",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ParserOptions {
    /// Wrap existing segment spans in synthetic block wrappers so they can
    /// be processed as independent blocks.
    pub isolate_segments: bool,
}

pub struct Parser<C: Contextualize> {
    contextualizer: C,
    options: ParserOptions,
    /// Builder stack; the root builder sits at the bottom, one child per
    /// open sub-document above it.
    builders: Vec<Builder>,
    /// Every tag currently open, dropped ones included.
    all_tags: Vec<TagRef>,
}

impl<C: Contextualize> Parser<C> {
    pub fn new(contextualizer: C, options: ParserOptions) -> Parser<C> {
        Parser {
            contextualizer,
            options,
            builders: vec![Builder::new()],
            all_tags: Vec::new(),
        }
    }

    /// Parse a chunk of HTML. May be called several times.
    pub fn feed(&mut self, html: &str) -> Result<(), Error> {
        sax::run(html, self)
    }

    /// Finish parsing and hand over the root document.
    pub fn into_doc(mut self) -> Doc {
        if self.builders.len() > 1 {
            warn!("unterminated sub-document, keeping the root document");
        }
        let root = self.builders.remove(0);
        root.into_doc()
    }

    fn builder(&mut self) -> &mut Builder {
        self.builders.last_mut().expect("builder stack is never empty")
    }

    /// Whether a tag is an inline annotation in the current context.
    fn is_inline_annotation_tag(&self, tag_name: &str, is_transclusion: bool) -> bool {
        let context = self.contextualizer.context();

        // <span> inside a media context acts like a block tag wrapping
        // another block tag such as <video>
        if tag_name == "span" && context == Some(Context::Media) {
            return false;
        }

        // audio and video are block tags, except in a media-inline context
        if (tag_name == "audio" || tag_name == "video") && context == Some(Context::MediaInline) {
            return true;
        }

        // style tags used as transclusions are inline, to avoid breaking
        // the surrounding sentence
        if tag_name == "style" && is_transclusion {
            return true;
        }

        !BLOCK_TAGS.contains(&tag_name)
    }
}

impl<C: Contextualize> SaxHandler for Parser<C> {
    fn on_open_tag(&mut self, tag: Tag) -> Result<(), Error> {
        let tag: TagRef = tag.shared();

        // a removable tag, or anything inside one, only keeps the stacks
        // aligned; nothing reaches the builder
        if self.contextualizer.context() == Some(Context::Removable)
            || self.contextualizer.is_removable(&tag)
        {
            self.all_tags.push(tag.clone());
            self.contextualizer.on_open(&tag);
            return Ok(());
        }

        if self.options.isolate_segments && utils::is_segment(&tag) {
            let wrapper = Tag::with_attributes("div", &[("class", "cx-segment-block")]).shared();
            self.builder().push_block_tag(wrapper);
        }

        if utils::is_reference(&tag) || utils::is_math(&tag) {
            // start of a sub-document: assemble it in a child builder
            self.builders.push(Builder::child(tag.clone()));
        } else if utils::is_inline_empty_tag(tag.name()) {
            let can_segment = self.contextualizer.can_segment();
            self.builder()
                .add_inline_content(InlineContent::Tag(tag.clone()), can_segment);
        } else if self.is_inline_annotation_tag(tag.name(), utils::is_transclusion(&tag)) {
            self.builder().push_inline_annotation_tag(tag.clone());
        } else {
            self.builder().push_block_tag(tag.clone());
        }

        self.all_tags.push(tag.clone());
        self.contextualizer.on_open(&tag);
        Ok(())
    }

    fn on_close_tag(&mut self, tag_name: &str) -> Result<(), Error> {
        let tag = match self.all_tags.pop() {
            Some(tag) => tag,
            None => {
                warn!("close of {} with nothing open", tag_name);
                return Ok(());
            }
        };
        let is_annotation =
            self.is_inline_annotation_tag(tag_name, utils::is_transclusion(&tag));

        if self.contextualizer.is_removable(&tag)
            || self.contextualizer.context() == Some(Context::Removable)
        {
            self.contextualizer.on_close();
            return Ok(());
        }
        self.contextualizer.on_close();

        if utils::is_inline_empty_tag(tag_name) {
            return Ok(());
        }

        if is_annotation && self.builder().inline_depth() > 0 {
            self.builder().pop_inline_annotation_tag(tag_name)?;
            if self.options.isolate_segments && utils::is_segment(&tag) {
                self.builder().pop_block_tag("div")?;
            }
        } else if is_annotation && self.builders.len() > 1 {
            // the close of a reference or math sub-document
            if tag_name != "span" && tag_name != "sup" {
                return Err(Error::MalformedInput(format!(
                    "expected a span or sup closing the sub-document, got \"{}\"",
                    tag_name
                )));
            }
            let child = self.builders.pop().expect("child builder present");
            let sub_doc = child.into_doc();
            let can_segment = self.contextualizer.can_segment();
            self.builder()
                .add_inline_content(InlineContent::SubDoc(Box::new(sub_doc)), can_segment);
        } else if !is_annotation {
            if tag_name == "p" && self.contextualizer.can_segment() {
                // flush trailing inline references into the outgoing block
                self.builder().add_text_chunk("", true);
            }
            self.builder().pop_block_tag(tag_name)?;
        } else {
            return Err(Error::MalformedInput(format!(
                "unexpected close tag: {}",
                tag_name
            )));
        }
        Ok(())
    }

    fn on_text(&mut self, text: &str) -> Result<(), Error> {
        if self.contextualizer.context() == Some(Context::Removable) {
            return Ok(());
        }
        let can_segment = self.contextualizer.can_segment();
        self.builder().add_text_chunk(text, can_segment);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::contextualizer::{Contextualizer, MwContextualizer};
    use super::super::doc::DocItem;

    use std::rc::Rc;
    use std::sync::Arc;

    use crate::config::{RemovableRules, RemovableSections};

    fn parse(html: &str) -> Doc {
        let mut parser = Parser::new(Contextualizer::new(), ParserOptions::default());
        parser.feed(html).unwrap();
        parser.into_doc()
    }

    fn parse_mw(html: &str, sections: RemovableSections) -> Doc {
        let rules = Arc::new(RemovableRules::compile(&sections).unwrap());
        let mut parser = Parser::new(MwContextualizer::new(rules), ParserOptions::default());
        parser.feed(html).unwrap();
        parser.into_doc()
    }

    #[test]
    fn round_trip_simple_document() {
        let html = "<html><body><p>a<b>c</b>d</p></body></html>";
        assert_eq!(parse(html).get_html(), html);
    }

    #[test]
    fn round_trip_preserves_blockspace() {
        let html = "<div><p>a</p>\n  <p>b</p></div>";
        assert_eq!(parse(html).get_html(), html);
    }

    #[test]
    fn open_close_items_balance() {
        let doc = parse("<div><p>a</p><ul><li>b</li><li>c</li></ul></div>");
        let mut depth = 0i64;
        for item in doc.items() {
            match item {
                DocItem::Open(_) => depth += 1,
                DocItem::Close(_) => {
                    depth -= 1;
                    assert!(depth >= 0);
                }
                _ => {}
            }
        }
        assert_eq!(depth, 0);
    }

    #[test]
    fn open_and_close_share_the_tag_record() {
        let doc = parse("<p>a</p>");
        match (&doc.items()[0], doc.items().last().unwrap()) {
            (DocItem::Open(open), DocItem::Close(close)) => {
                assert!(Rc::ptr_eq(open, close));
            }
            other => panic!("unexpected items: {:?}", other),
        }
    }

    #[test]
    fn reference_becomes_a_sub_document() {
        let doc = parse_mw(
            "<p>Fact.<sup typeof=\"mw:Extension/ref\" id=\"r1\"><a href=\"#cite_note-1\">[1]</a></sup></p>",
            RemovableSections::default(),
        );
        let block = doc
            .items()
            .iter()
            .find_map(|item| match item {
                DocItem::TextBlock(block) => Some(block),
                _ => None,
            })
            .expect("paragraph becomes a text block");
        assert!(block.can_segment());
        let sub = block
            .chunks()
            .iter()
            .find_map(|chunk| match &chunk.inline_content {
                Some(InlineContent::SubDoc(sub)) => Some(sub),
                _ => None,
            })
            .expect("the reference is inline content");
        assert_eq!(
            sub.get_html(),
            "<sup typeof=\"mw:Extension/ref\" id=\"r1\"><a href=\"#cite_note-1\">[1]</a></sup>"
        );
        // the reference body keeps its own text out of the block plaintext
        assert_eq!(block.get_plain_text(), "Fact.");
    }

    #[test]
    fn math_becomes_a_sub_document() {
        let doc = parse_mw(
            "<p>x<span typeof=\"mw:Extension/math\" id=\"m1\">y</span>z</p>",
            RemovableSections::default(),
        );
        assert_eq!(
            doc.get_html(),
            "<p>x<span typeof=\"mw:Extension/math\" id=\"m1\">y</span>z</p>"
        );
    }

    #[test]
    fn removable_subtree_leaves_no_trace() {
        let sections = RemovableSections {
            classes: vec!["ambox".to_string()],
            rdfa: vec![],
            templates: vec![],
        };
        let doc = parse_mw(
            "<html><body><div class=\"ambox\"><p>Notice</p></div><p>Keep me.</p></body></html>",
            sections,
        );
        let html = doc.get_html();
        assert!(!html.contains("ambox"));
        assert!(!html.contains("Notice"));
        assert!(html.contains("Keep me."));
    }

    #[test]
    fn figure_span_is_treated_as_block() {
        let doc = parse_mw(
            "<figure><span><video src=\"v\"></video></span><figcaption>c</figcaption></figure>",
            RemovableSections::default(),
        );
        // the span must appear as a block item, not an annotation
        assert!(doc.items().iter().any(|item| {
            matches!(item, DocItem::Open(tag) if tag.name() == "span")
        }));
    }

    #[test]
    fn unexpected_subdocument_close_is_an_error() {
        let rules = Arc::new(RemovableRules::compile(&RemovableSections::default()).unwrap());
        let mut parser = Parser::new(MwContextualizer::new(rules), ParserOptions::default());
        // the reference body ends in a close that cannot end a sub-document
        let result = parser.feed("<p><sup typeof=\"mw:Extension/ref\">x</i></p>");
        assert!(result.is_err());
    }

    #[test]
    fn segment_isolation_wraps_existing_segments() {
        let rules = Arc::new(RemovableRules::compile(&RemovableSections::default()).unwrap());
        let mut parser = Parser::new(
            MwContextualizer::new(rules),
            ParserOptions {
                isolate_segments: true,
            },
        );
        parser
            .feed("<p><span class=\"cx-segment\" data-segmentid=\"7\">One.</span></p>")
            .unwrap();
        let doc = parser.into_doc();
        assert!(doc.items().iter().any(|item| {
            matches!(item, DocItem::Open(tag) if tag.attr("class").as_deref() == Some("cx-segment-block"))
        }));
        // synthetic wrappers never serialize
        assert!(!doc.get_html().contains("cx-segment-block"));
    }

    #[test]
    fn category_links_are_collected() {
        let doc = parse_mw(
            "<p>a<link rel=\"mw:PageProp/Category\" href=\"./Category:X\"/>b</p>",
            RemovableSections::default(),
        );
        assert_eq!(doc.categories().len(), 1);
        assert_eq!(doc.get_plain_text(), "ab\n");
    }

    #[test]
    fn stray_close_is_tolerated() {
        let mut parser = Parser::new(Contextualizer::new(), ParserOptions::default());
        parser.feed("</div><p>a</p>").unwrap();
        assert_eq!(parser.into_doc().get_html(), "<p>a</p>");
    }
}
