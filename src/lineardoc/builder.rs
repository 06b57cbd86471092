//! Stateful assembler turning parser events into a [Doc].
use std::rc::Rc;

use itertools::Itertools;

use super::chunk::{InlineContent, TextChunk};
use super::block::TextBlock;
use super::doc::{Doc, DocItem};
use super::tag::TagRef;
use super::utils;

use crate::error::Error;

#[derive(Debug, Default)]
pub struct Builder {
    /// Stack of open block tags.
    block_tags: Vec<TagRef>,
    /// Stack of open inline annotation tags.
    inline_annotation_tags: Vec<TagRef>,
    /// Height of the annotation stack that has been materialized in at
    /// least one chunk.
    inline_annotation_tags_used: usize,
    /// Chunks of the text block being assembled.
    text_chunks: Vec<TextChunk>,
    is_block_segmentable: bool,
    doc: Doc,
    is_child: bool,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            is_block_segmentable: true,
            ..Builder::default()
        }
    }

    /// A builder for a sub-document (reference or math body). The parser
    /// keeps child builders on a stack and moves the finished document back
    /// into the parent's pending chunk.
    pub fn child(wrapper_tag: TagRef) -> Builder {
        Builder {
            doc: Doc::with_wrapper(wrapper_tag),
            is_child: true,
            is_block_segmentable: true,
            ..Builder::default()
        }
    }

    pub fn is_child(&self) -> bool {
        self.is_child
    }

    pub fn inline_depth(&self) -> usize {
        self.inline_annotation_tags.len()
    }

    pub fn annotation_tags_used(&self) -> usize {
        self.inline_annotation_tags_used
    }

    /// Finish any pending text and hand over the document.
    pub fn into_doc(mut self) -> Doc {
        self.finish_text_block();
        self.doc
    }

    fn is_ignored_tag(&self, tag: &TagRef, parent: Option<&TagRef>) -> bool {
        if utils::is_category(tag) {
            return true;
        }
        // only the renderer's top-level section markers disappear; nested
        // ones are ordinary blocks
        utils::is_section_marker(tag)
            && parent
                .map(|p| p.name() == "body" || p.name() == "html")
                .unwrap_or(true)
    }

    pub fn push_block_tag(&mut self, tag: TagRef) {
        self.finish_text_block();
        let parent = self.block_tags.last().cloned();
        self.block_tags.push(tag.clone());
        if self.is_ignored_tag(&tag, parent.as_ref()) {
            return;
        }
        if tag.name() == "figure" {
            tag.set_attr("rel", "cx:Figure");
        }
        self.doc.add_item(DocItem::Open(tag));
    }

    pub fn pop_block_tag(&mut self, tag_name: &str) -> Result<TagRef, Error> {
        let tag = self.block_tags.pop().filter(|tag| tag.name() == tag_name);
        let tag = tag.ok_or_else(|| {
            Error::MalformedInput(format!("mismatched block tag close: {}", tag_name))
        })?;
        self.finish_text_block();

        let parent = self.block_tags.last().cloned();
        if !self.is_ignored_tag(&tag, parent.as_ref()) {
            self.doc.add_item(DocItem::Close(tag.clone()));
        }
        Ok(tag)
    }

    pub fn push_inline_annotation_tag(&mut self, tag: TagRef) {
        self.inline_annotation_tags.push(tag);
    }

    /// Pop an annotation tag. If only whitespace was written under a
    /// reference, external link or transclusion, the whitespace chunks are
    /// replaced by a single inline sub-document so the empty element
    /// survives as content instead of annotation.
    pub fn pop_inline_annotation_tag(&mut self, tag_name: &str) -> Result<(), Error> {
        let tag = self
            .inline_annotation_tags
            .pop()
            .filter(|tag| tag.name() == tag_name)
            .ok_or_else(|| {
                Error::MalformedInput(format!("mismatched inline tag close: {}", tag_name))
            })?;

        if self.inline_annotation_tags_used == self.inline_annotation_tags.len() {
            self.inline_annotation_tags_used = self.inline_annotation_tags_used.saturating_sub(1);
        }

        if tag.attributes().is_empty() {
            // nothing worth preserving
            return Ok(());
        }

        let mut replace = true;
        let mut whitespace: Vec<String> = Vec::new();
        let mut keep = self.text_chunks.len();
        while keep > 0 {
            let chunk = &self.text_chunks[keep - 1];
            let top = match chunk.top_tag() {
                Some(top) => top,
                None => break,
            };
            if !chunk.text.trim().is_empty()
                || chunk.inline_content.is_some()
                || !Rc::ptr_eq(top, &tag)
            {
                replace = false;
                break;
            }
            whitespace.push(chunk.text.clone());
            keep -= 1;
        }

        if replace
            && (utils::is_reference(&tag)
                || utils::is_external_link(&tag)
                || utils::is_transclusion(&tag))
        {
            self.text_chunks.truncate(keep);
            whitespace.reverse();
            let mut sub_doc = Doc::new();
            sub_doc
                .add_item(DocItem::Open(tag.clone()))
                .add_item(DocItem::TextBlock(TextBlock::new(
                    vec![TextChunk::new(whitespace.concat(), Vec::new())],
                    true,
                )))
                .add_item(DocItem::Close(tag));
            self.add_inline_content(InlineContent::SubDoc(Box::new(sub_doc)), true);
        }
        Ok(())
    }

    pub fn add_text_chunk(&mut self, text: &str, can_segment: bool) {
        self.text_chunks.push(TextChunk::new(
            text.to_string(),
            self.inline_annotation_tags.clone(),
        ));
        self.inline_annotation_tags_used = self.inline_annotation_tags.len();
        self.is_block_segmentable &= can_segment;
    }

    /// Add content that needs no linearizing: an empty inline tag or a
    /// finished sub-document. Category links are captured aside.
    pub fn add_inline_content(&mut self, content: InlineContent, can_segment: bool) {
        if let InlineContent::Tag(tag) = &content {
            if utils::is_category(tag) {
                self.doc.push_category(tag.clone());
                return;
            }
        }
        self.text_chunks.push(TextChunk::with_inline_content(
            String::new(),
            self.inline_annotation_tags.clone(),
            content,
        ));
        self.inline_annotation_tags_used = self.inline_annotation_tags.len();
        self.is_block_segmentable &= can_segment;
    }

    /// Close the pending text block: whitespace-only runs become block
    /// space, anything else a text block.
    pub fn finish_text_block(&mut self) {
        if self.text_chunks.is_empty() {
            return;
        }
        let whitespace_only = self.text_chunks.iter().all(TextChunk::is_whitespace);
        if whitespace_only {
            let space = self.text_chunks.drain(..).map(|chunk| chunk.text).join("");
            self.doc.add_item(DocItem::BlockSpace(space));
        } else {
            let chunks = std::mem::take(&mut self.text_chunks);
            self.doc.add_item(DocItem::TextBlock(TextBlock::new(
                chunks,
                self.is_block_segmentable,
            )));
        }
        self.text_chunks.clear();
        self.is_block_segmentable = true;
    }
}
