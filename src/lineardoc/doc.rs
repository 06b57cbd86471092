//! An HTML document in linear representation.
//!
//! The document is an ordered list of items: block open tags, block close
//! tags, text blocks of annotated inline text, and block whitespace (runs of
//! whitespace between block boundaries, kept verbatim for faithful
//! round-tripping).
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use super::block::TextBlock;
use super::chunk::{InlineContent, TextChunk};
use super::tag::{Tag, TagRef};
use super::utils;

use crate::error::Error;

/// Boundary source for segmentation: plaintext in, ordered byte offsets out.
pub type BoundaryFn<'a> = dyn Fn(&str) -> Result<Vec<usize>, Error> + 'a;

/// Monotonic id source. Segment and link ids within one document are drawn
/// from the same counter.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: Cell<u64>,
}

impl IdAllocator {
    pub fn new() -> IdAllocator {
        IdAllocator::default()
    }

    pub fn next_id(&self) -> String {
        let id = self.next.get();
        self.next.set(id + 1);
        id.to_string()
    }
}

#[derive(Debug, Clone)]
pub enum DocItem {
    Open(TagRef),
    Close(TagRef),
    TextBlock(TextBlock),
    BlockSpace(String),
}

#[derive(Debug, Clone, Default)]
pub struct Doc {
    wrapper_tag: Option<TagRef>,
    items: Vec<DocItem>,
    categories: Vec<TagRef>,
}

impl Doc {
    pub fn new() -> Doc {
        Doc::default()
    }

    pub fn with_wrapper(wrapper_tag: TagRef) -> Doc {
        Doc {
            wrapper_tag: Some(wrapper_tag),
            ..Doc::default()
        }
    }

    pub fn items(&self) -> &[DocItem] {
        &self.items
    }

    pub fn wrapper_tag(&self) -> Option<&TagRef> {
        self.wrapper_tag.as_ref()
    }

    pub fn categories(&self) -> &[TagRef] {
        &self.categories
    }

    pub fn push_category(&mut self, tag: TagRef) {
        self.categories.push(tag);
    }

    pub fn add_item(&mut self, item: DocItem) -> &mut Doc {
        self.items.push(item);
        self
    }

    pub fn undo_add_item(&mut self) -> Option<DocItem> {
        self.items.pop()
    }

    pub fn current_item(&self) -> Option<&DocItem> {
        self.items.last()
    }

    /// The wrapper tag, or the first open tag of the item stream.
    pub fn get_root_item(&self) -> Option<TagRef> {
        if let Some(wrapper) = &self.wrapper_tag {
            return Some(wrapper.clone());
        }
        self.items.iter().find_map(|item| match item {
            DocItem::Open(tag) => Some(tag.clone()),
            _ => None,
        })
    }

    /// Plaintext of the document: each text block followed by a newline,
    /// block whitespace verbatim.
    pub fn get_plain_text(&self) -> String {
        let mut text = String::new();
        for item in &self.items {
            match item {
                DocItem::TextBlock(block) => {
                    text.push_str(&block.get_plain_text());
                    text.push('\n');
                }
                DocItem::BlockSpace(space) => text.push_str(space),
                _ => {}
            }
        }
        text
    }

    pub fn get_html(&self) -> String {
        let mut html = String::new();
        if let Some(wrapper) = &self.wrapper_tag {
            html.push_str(&utils::get_open_tag_html(wrapper));
        }

        for item in &self.items {
            match item {
                DocItem::Open(tag) | DocItem::Close(tag)
                    if tag.attr("class").as_deref() == Some("cx-segment-block") =>
                {
                    // synthetic isolation wrappers never serialize
                }
                DocItem::Open(tag) => {
                    html.push_str(&utils::get_open_tag_html(tag));
                }
                DocItem::Close(tag) => html.push_str(&utils::get_close_tag_html(tag)),
                DocItem::BlockSpace(space) => html.push_str(space),
                DocItem::TextBlock(block) => html.push_str(&block.get_html()),
            }
        }

        if let Some(wrapper) = &self.wrapper_tag {
            html.push_str(&utils::get_close_tag_html(wrapper));
        }
        for category in &self.categories {
            html.push_str(&utils::get_open_tag_html(category));
            html.push_str(&utils::get_close_tag_html(category));
        }
        html
    }

    /// Balanced HTML fragments, one per text block.
    pub fn get_segments(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|item| match item {
                DocItem::TextBlock(block) => Some(block.get_html()),
                _ => None,
            })
            .collect()
    }

    /// Deep copy. Tags are recreated at their attribute maps, with sharing
    /// between items and chunk snapshots preserved through a pointer memo.
    pub fn deep_clone(&self) -> Doc {
        let mut memo: HashMap<*const Tag, TagRef> = HashMap::new();
        self.deep_clone_with(&mut memo)
    }

    fn deep_clone_with(&self, memo: &mut HashMap<*const Tag, TagRef>) -> Doc {
        let clone_tag = |tag: &TagRef, memo: &mut HashMap<*const Tag, TagRef>| -> TagRef {
            let key = Rc::as_ptr(tag);
            if let Some(existing) = memo.get(&key) {
                return existing.clone();
            }
            let copy = tag.clone_tag().shared();
            memo.insert(key, copy.clone());
            copy
        };

        let mut doc = Doc {
            wrapper_tag: self.wrapper_tag.as_ref().map(|t| clone_tag(t, memo)),
            items: Vec::with_capacity(self.items.len()),
            categories: self.categories.iter().map(|t| clone_tag(t, memo)).collect(),
        };

        for item in &self.items {
            let item = match item {
                DocItem::Open(tag) => DocItem::Open(clone_tag(tag, memo)),
                DocItem::Close(tag) => DocItem::Close(clone_tag(tag, memo)),
                DocItem::BlockSpace(space) => DocItem::BlockSpace(space.clone()),
                DocItem::TextBlock(block) => {
                    let chunks = block
                        .chunks()
                        .iter()
                        .map(|chunk| TextChunk {
                            text: chunk.text.clone(),
                            tags: chunk.tags.iter().map(|t| clone_tag(t, memo)).collect(),
                            inline_content: chunk.inline_content.as_ref().map(|content| {
                                match content {
                                    InlineContent::Tag(tag) => {
                                        InlineContent::Tag(clone_tag(tag, memo))
                                    }
                                    InlineContent::SubDoc(sub) => InlineContent::SubDoc(
                                        Box::new(sub.deep_clone_with(memo)),
                                    ),
                                }
                            }),
                        })
                        .collect();
                    DocItem::TextBlock(TextBlock::new(chunks, block.can_segment()))
                }
            };
            doc.items.push(item);
        }
        doc
    }

    /// Segment every eligible text block into sentences, assigning segment
    /// and link ids from one document-wide counter. Text blocks inside a
    /// transclusion context, and blocks flagged non-segmentable, only get
    /// link ids.
    pub fn segment(&self, get_boundaries: &BoundaryFn<'_>) -> Result<Doc, Error> {
        let ids = IdAllocator::new();
        let mut new_doc = Doc {
            wrapper_tag: self.wrapper_tag.clone(),
            items: Vec::with_capacity(self.items.len()),
            categories: self.categories.clone(),
        };
        let mut transclusion_context: Option<String> = None;

        for item in &self.items {
            match item {
                DocItem::Open(tag) => {
                    if tag.has_attr("typeof") {
                        if let Some(about) = tag.attr("about") {
                            transclusion_context = Some(about);
                        }
                    }
                    new_doc.add_item(item.clone());
                }
                DocItem::Close(tag) => {
                    if transclusion_context.is_some()
                        && tag.attr("about") == transclusion_context
                    {
                        transclusion_context = None;
                    }
                    new_doc.add_item(item.clone());
                }
                DocItem::TextBlock(block) => {
                    let replaced = if block.can_segment() && transclusion_context.is_none() {
                        block.segment(get_boundaries, &ids)?
                    } else {
                        block.set_link_ids(&ids)
                    };
                    new_doc.add_item(DocItem::TextBlock(replaced));
                }
                DocItem::BlockSpace(_) => {
                    new_doc.add_item(item.clone());
                }
            }
        }
        Ok(new_doc)
    }

    /// Wrap the body content into numbered translation sections.
    ///
    /// The parser has already dropped the renderer's own top-level section
    /// markers, so each run of connected top-level items inside `<body>` is
    /// wrapped in a fresh `<section rel="cx:Section">` carrying a
    /// `cxSourceSection` id and a section number. Top-level tags sharing an
    /// `about`/`id` join the same section; trailing whitespace and rootless
    /// text blocks attach to the section before them. Afterwards every open
    /// item without an `id` attribute gets a sequential integer id.
    pub fn wrap_sections(&self) -> Doc {
        let mut new_doc = Doc {
            wrapper_tag: self.wrapper_tag.clone(),
            items: Vec::with_capacity(self.items.len() + 8),
            categories: self.categories.clone(),
        };

        let mut in_body = false;
        // depth of nesting below the top level of the body
        let mut depth = 0usize;
        let mut section_count = 0usize;
        // identifier (about/id attribute) and tag of the open/last section
        let mut current: Option<(Option<String>, TagRef)> = None;
        let mut previous: Option<(Option<String>, TagRef)> = None;

        let open_section = |doc: &mut Doc, count: &mut usize| -> TagRef {
            let number = count.to_string();
            let section = Tag::with_attributes(
                "section",
                &[
                    ("rel", "cx:Section"),
                    ("id", &format!("cxSourceSection{}", count)),
                    ("data-mw-section-number", &number),
                ],
            )
            .shared();
            *count += 1;
            doc.items.push(DocItem::Open(section.clone()));
            section
        };

        for item in &self.items {
            if !in_body {
                if let DocItem::Open(tag) = item {
                    if tag.name() == "body" {
                        in_body = true;
                    }
                }
                new_doc.items.push(item.clone());
                continue;
            }

            match item {
                DocItem::Open(tag) => {
                    if depth == 0 && current.is_none() {
                        let id = explicit_identifier(tag);
                        let reconnect = id.is_some()
                            && previous.as_ref().map(|(pid, _)| pid == &id).unwrap_or(false)
                            && closes_section(new_doc.items.last(), &previous);
                        if reconnect {
                            // a fragment of the previous section: reopen it
                            new_doc.items.pop();
                            current = previous.take();
                        } else {
                            let section = open_section(&mut new_doc, &mut section_count);
                            current = Some((id, section));
                        }
                    }
                    depth += 1;
                    new_doc.items.push(item.clone());
                }
                DocItem::Close(tag) => {
                    if depth == 0 && tag.name() == "body" {
                        if let Some((id, section)) = current.take() {
                            new_doc.items.push(DocItem::Close(section.clone()));
                            previous = Some((id, section));
                        }
                        new_doc.items.push(item.clone());
                        in_body = false;
                    } else {
                        depth = depth.saturating_sub(1);
                        new_doc.items.push(item.clone());
                        if depth == 0 {
                            if let Some((id, section)) = current.take() {
                                new_doc.items.push(DocItem::Close(section.clone()));
                                previous = Some((id, section));
                            }
                        }
                    }
                }
                DocItem::BlockSpace(_) => {
                    if depth == 0
                        && current.is_none()
                        && closes_section(new_doc.items.last(), &previous)
                    {
                        let close = new_doc.items.pop().expect("section close present");
                        new_doc.items.push(item.clone());
                        new_doc.items.push(close);
                    } else {
                        new_doc.items.push(item.clone());
                    }
                }
                DocItem::TextBlock(block) => {
                    if depth > 0 || current.is_some() {
                        new_doc.items.push(item.clone());
                        continue;
                    }
                    let root_id = block.get_root_item().and_then(|t| explicit_identifier(&t));
                    let connected = match (&root_id, &previous) {
                        (None, Some(_)) => true,
                        (Some(id), Some((Some(pid), _))) => id == pid,
                        _ => false,
                    } && closes_section(new_doc.items.last(), &previous);
                    if connected {
                        let close = new_doc.items.pop().expect("section close present");
                        new_doc.items.push(item.clone());
                        new_doc.items.push(close);
                    } else {
                        let section = open_section(&mut new_doc, &mut section_count);
                        new_doc.items.push(item.clone());
                        new_doc.items.push(DocItem::Close(section.clone()));
                        previous = Some((root_id, section));
                    }
                }
            }
        }

        // sequential integer ids for the wrapper and every open item
        let mut next_id = 0u64;
        if let Some(wrapper) = &new_doc.wrapper_tag {
            if !wrapper.has_attr("id") {
                wrapper.set_attr("id", &next_id.to_string());
                next_id += 1;
            }
        }
        for item in &new_doc.items {
            if let DocItem::Open(tag) = item {
                if !tag.has_attr("id") {
                    tag.set_attr("id", &next_id.to_string());
                    next_id += 1;
                }
            }
        }
        new_doc
    }
}

/// An identifier a tag was given by the renderer, if any.
fn explicit_identifier(tag: &Tag) -> Option<String> {
    tag.attr("about")
        .filter(|v| !v.is_empty())
        .or_else(|| tag.attr("id").filter(|v| !v.is_empty()))
}

/// Whether `item` is the close of the section recorded in `previous`.
fn closes_section(item: Option<&DocItem>, previous: &Option<(Option<String>, TagRef)>) -> bool {
    match (item, previous) {
        (Some(DocItem::Close(tag)), Some((_, section))) => Rc::ptr_eq(tag, section),
        _ => false,
    }
}
