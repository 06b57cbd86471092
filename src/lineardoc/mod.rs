//! Linear document representation for MediaWiki HTML.
//!
//! A tree of tags becomes a flat sequence of items: block open/close tags,
//! text blocks of annotated inline text, and inter-block whitespace. The
//! flat form keeps every text block's plaintext identical to what a
//! sentence segmenter sees, so boundary offsets map back onto the
//! annotated chunks without loss.
pub mod block;
pub mod builder;
pub mod chunk;
pub mod contextualizer;
pub mod doc;
pub mod normalizer;
pub mod parser;
pub mod sax;
pub mod tag;
pub mod utils;

pub use block::{CharRange, ChunkOffset, RangeMapping, TextBlock};
pub use builder::Builder;
pub use chunk::{InlineContent, TextChunk};
pub use contextualizer::{Context, Contextualize, Contextualizer, MwContextualizer};
pub use doc::{Doc, DocItem, IdAllocator};
pub use normalizer::Normalizer;
pub use parser::{Parser, ParserOptions};
pub use tag::{Attributes, Tag, TagRef};
