//! Sentence segmentation for linear documents.
mod segmenter;

pub use segmenter::{CxSegmenter, RuleSplitter, SentenceSplitter};
