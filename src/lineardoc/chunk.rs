//! A chunk of uniformly-annotated inline text.
//!
//! The annotations are a snapshot of the open inline tags (`<a>`, `<i>`,
//! ...) at the moment the chunk was created, plus an optional inline
//! element: an empty tag such as `<br>`, or a sub-document holding a
//! reference or math body. The annotations apply to the whole text, so text
//! with varying markup is split over several chunks.
use super::doc::Doc;
use super::tag::TagRef;

#[derive(Debug, Clone)]
pub enum InlineContent {
    Tag(TagRef),
    SubDoc(Box<Doc>),
}

#[derive(Debug, Clone)]
pub struct TextChunk {
    /// Plaintext in the chunk, possibly empty.
    pub text: String,
    /// Open inline-annotation tags applying to the whole text. A shallow
    /// snapshot: the `Vec` is owned, the tags are shared.
    pub tags: Vec<TagRef>,
    /// Inline element, present only for zero-width chunks.
    pub inline_content: Option<InlineContent>,
}

impl TextChunk {
    pub fn new(text: String, tags: Vec<TagRef>) -> TextChunk {
        TextChunk {
            text,
            tags,
            inline_content: None,
        }
    }

    pub fn with_inline_content(
        text: String,
        tags: Vec<TagRef>,
        inline_content: InlineContent,
    ) -> TextChunk {
        TextChunk {
            text,
            tags,
            inline_content: Some(inline_content),
        }
    }

    /// The innermost annotation, if any.
    pub fn top_tag(&self) -> Option<&TagRef> {
        self.tags.last()
    }

    pub fn is_whitespace(&self) -> bool {
        self.inline_content.is_none() && self.text.trim().is_empty()
    }
}
