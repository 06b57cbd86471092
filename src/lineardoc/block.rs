//! A block of annotated inline text.
use std::rc::Rc;

use super::chunk::{InlineContent, TextChunk};
use super::doc::{BoundaryFn, IdAllocator};
use super::tag::{Tag, TagRef};
use super::utils;

use crate::error::Error;

/// Position of one chunk's text within the block plaintext, in bytes.
#[derive(Debug, Clone)]
pub struct ChunkOffset {
    pub start: usize,
    pub length: usize,
    pub tags: Vec<TagRef>,
}

/// A source-to-target plaintext range pair used to project annotations onto
/// a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharRange {
    pub start: usize,
    pub length: usize,
}

impl CharRange {
    pub fn new(start: usize, length: usize) -> CharRange {
        CharRange { start, length }
    }

    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeMapping {
    pub source: CharRange,
    pub target: CharRange,
}

#[derive(Debug, Clone)]
pub struct TextBlock {
    chunks: Vec<TextChunk>,
    can_segment: bool,
    offsets: Vec<ChunkOffset>,
}

impl TextBlock {
    pub fn new(chunks: Vec<TextChunk>, can_segment: bool) -> TextBlock {
        let mut offsets = Vec::with_capacity(chunks.len());
        let mut cursor = 0usize;
        for chunk in &chunks {
            offsets.push(ChunkOffset {
                start: cursor,
                length: chunk.text.len(),
                tags: chunk.tags.clone(),
            });
            cursor += chunk.text.len();
        }
        TextBlock {
            chunks,
            can_segment,
            offsets,
        }
    }

    pub fn chunks(&self) -> &[TextChunk] {
        &self.chunks
    }

    pub fn can_segment(&self) -> bool {
        self.can_segment
    }

    pub fn offsets(&self) -> &[ChunkOffset] {
        &self.offsets
    }

    /// The longest prefix of annotation tags shared by every chunk.
    /// Tags are compared by identity, not value.
    pub fn common_tags(&self) -> Vec<TagRef> {
        let mut common = match self.chunks.first() {
            Some(chunk) => chunk.tags.clone(),
            None => return Vec::new(),
        };
        for chunk in &self.chunks[1..] {
            let matching = common
                .iter()
                .zip(chunk.tags.iter())
                .take_while(|(a, b)| Rc::ptr_eq(a, b))
                .count();
            common.truncate(matching);
        }
        common
    }

    /// Offsets of non-empty chunks annotated more deeply than the common
    /// tags; these delimit the regions a segmenter must not merge across.
    pub fn get_tag_offsets(&self) -> Vec<ChunkOffset> {
        let common = self.common_tags();
        self.offsets
            .iter()
            .zip(self.chunks.iter())
            .filter(|(_, chunk)| chunk.tags.len() > common.len() && !chunk.text.is_empty())
            .map(|(offset, _)| offset.clone())
            .collect()
    }

    pub fn get_plain_text(&self) -> String {
        self.chunks.iter().map(|chunk| chunk.text.as_str()).collect()
    }

    /// The last chunk whose text covers the given plaintext offset.
    fn text_chunk_at(&self, char_offset: usize) -> &TextChunk {
        let index = self
            .offsets
            .partition_point(|offset| offset.start <= char_offset);
        &self.chunks[index.saturating_sub(1)]
    }

    /// A tag that can represent this block, e.g. for section identification.
    ///
    /// Returns the first annotation (or inline sub-document root) found
    /// before any plain non-whitespace text; plain text blocks have none.
    pub fn get_root_item(&self) -> Option<TagRef> {
        for chunk in &self.chunks {
            if chunk.tags.is_empty() && chunk.text.chars().any(|c| !c.is_whitespace()) {
                return None;
            }
            if let Some(tag) = chunk.tags.first() {
                return Some(tag.clone());
            }
            match &chunk.inline_content {
                Some(InlineContent::SubDoc(doc)) => return doc.get_root_item(),
                Some(InlineContent::Tag(tag)) => return Some(tag.clone()),
                None => {}
            }
        }
        None
    }

    /// Render the block, closing and reopening as few tags as possible
    /// between adjacent chunks. Tag stacks are compared by identity.
    pub fn get_html(&self) -> String {
        let mut html = String::new();
        let mut old_tags: &[TagRef] = &[];

        for chunk in &self.chunks {
            let matching = old_tags
                .iter()
                .zip(chunk.tags.iter())
                .take_while(|(a, b)| Rc::ptr_eq(a, b))
                .count();
            for tag in old_tags[matching..].iter().rev() {
                html.push_str(&utils::get_close_tag_html(tag));
            }
            for tag in &chunk.tags[matching..] {
                html.push_str(&utils::get_open_tag_html(tag));
            }
            old_tags = &chunk.tags;

            html.push_str(&utils::esc(&chunk.text));
            match &chunk.inline_content {
                Some(InlineContent::SubDoc(doc)) => html.push_str(&doc.get_html()),
                Some(InlineContent::Tag(tag)) => {
                    html.push_str(&utils::get_open_tag_html(tag));
                    html.push_str(&utils::get_close_tag_html(tag));
                }
                None => {}
            }
        }

        for tag in old_tags.iter().rev() {
            html.push_str(&utils::get_close_tag_html(tag));
        }
        html
    }

    /// Split the block into sentence segments.
    ///
    /// Each segment is wrapped in a `cx-segment` span inserted above the
    /// segment's common tags; translatable links get their ids while the
    /// segment is flushed. Ids are only drawn for segments that actually
    /// accumulate content. Blocks rooted in a transclusion are returned
    /// unchanged.
    pub fn segment(&self, get_boundaries: &BoundaryFn<'_>, ids: &IdAllocator) -> Result<TextBlock, Error> {
        if let Some(root) = self.get_root_item() {
            if utils::is_transclusion(&root) {
                return Ok(self.clone());
            }
        }

        let plain_text = self.get_plain_text();
        let boundaries = get_boundaries(&plain_text)?;
        let groups = utils::get_chunk_boundary_groups(&boundaries, &self.chunks);

        let mut all_chunks: Vec<TextChunk> = Vec::new();
        let mut current_chunks: Vec<TextChunk> = Vec::new();
        let mut offset = 0usize;

        for (chunk, group) in self.chunks.iter().zip(groups.into_iter()) {
            let mut piece = chunk.clone();
            for boundary in group {
                let rel_offset = boundary - offset;
                if rel_offset == 0 {
                    flush_segment(&mut current_chunks, &mut all_chunks, ids);
                    continue;
                }
                let left = TextChunk::new(piece.text[..rel_offset].to_string(), piece.tags.clone());
                let right = TextChunk {
                    text: piece.text[rel_offset..].to_string(),
                    tags: piece.tags.clone(),
                    inline_content: piece.inline_content.take(),
                };
                current_chunks.push(left);
                offset += rel_offset;
                flush_segment(&mut current_chunks, &mut all_chunks, ids);
                piece = right;
            }
            // even a zero-width piece may carry a reference
            offset += piece.text.len();
            current_chunks.push(piece);
        }
        flush_segment(&mut current_chunks, &mut all_chunks, ids);

        Ok(TextBlock::new(all_chunks, true))
    }

    /// Assign link ids without segmenting; the block itself is unchanged.
    pub fn set_link_ids(&self, ids: &IdAllocator) -> TextBlock {
        utils::set_link_ids_in_place(&self.chunks, ids);
        self.clone()
    }

    /// Create a new block, applying our annotations to a translation.
    ///
    /// Each mapped target range takes the tags and inline content of the
    /// source chunk covering its source start. Zero-width source chunks
    /// inside a mapped source range are carried over at the range's target
    /// end. Gaps and trailing text fall back to the block's common tags,
    /// with trailing whitespace appended last.
    pub fn translate_tags(
        &self,
        target_text: &str,
        range_mappings: &[RangeMapping],
    ) -> Result<TextBlock, Error> {
        struct Positioned {
            start: usize,
            length: usize,
            chunk: TextChunk,
        }

        // zero-width chunks by source offset, in order
        let mut empty_chunks: Vec<(usize, Vec<TextChunk>)> = Vec::new();
        for (i, chunk) in self.chunks.iter().enumerate() {
            if !chunk.text.is_empty() {
                continue;
            }
            let offset = self.offsets[i].start;
            match empty_chunks.last_mut() {
                Some((last, list)) if *last == offset => list.push(chunk.clone()),
                _ => empty_chunks.push((offset, vec![chunk.clone()])),
            }
        }

        let mut placed: Vec<Positioned> = Vec::new();
        for mapping in range_mappings {
            let source_end = mapping.source.end();
            let target_end = mapping.target.end();
            if target_end > target_text.len()
                || !target_text.is_char_boundary(mapping.target.start)
                || !target_text.is_char_boundary(target_end)
            {
                return Err(Error::MalformedInput(format!(
                    "target range {}..{} outside the target text",
                    mapping.target.start, target_end
                )));
            }

            let source_chunk = self.text_chunk_at(mapping.source.start);
            placed.push(Positioned {
                start: mapping.target.start,
                length: mapping.target.length,
                chunk: TextChunk {
                    text: target_text[mapping.target.start..target_end].to_string(),
                    tags: source_chunk.tags.clone(),
                    inline_content: source_chunk.inline_content.clone(),
                },
            });

            // zero-width source chunks in range move to the target range end
            empty_chunks.retain(|(offset, list)| {
                if *offset < mapping.source.start || *offset > source_end {
                    return true;
                }
                for chunk in list {
                    placed.push(Positioned {
                        start: target_end,
                        length: 0,
                        chunk: chunk.clone(),
                    });
                }
                false
            });
        }

        placed.sort_by_key(|p| p.start);

        // fill gaps between mapped ranges with common-tag text
        let common = self.common_tags();
        let mut pos = 0usize;
        let mut i = 0;
        while i < placed.len() {
            let start = placed[i].start;
            if start < pos {
                return Err(Error::MalformedInput(format!(
                    "overlapping target ranges at {}",
                    start
                )));
            }
            if start > pos {
                placed.insert(
                    i,
                    Positioned {
                        start: pos,
                        length: start - pos,
                        chunk: TextChunk::new(target_text[pos..start].to_string(), common.clone()),
                    },
                );
                i += 1;
            }
            pos = placed[i].start + placed[i].length;
            i += 1;
        }

        let remainder = &target_text[pos..];
        let tail = remainder.trim_end();
        let tail_space = &remainder[tail.len()..];

        if !tail.is_empty() {
            placed.push(Positioned {
                start: pos,
                length: tail.len(),
                chunk: TextChunk::new(tail.to_string(), common.clone()),
            });
            pos += tail.len();
        }
        for (_, list) in &empty_chunks {
            for chunk in list {
                placed.push(Positioned {
                    start: pos,
                    length: 0,
                    chunk: chunk.clone(),
                });
            }
        }
        if !tail_space.is_empty() {
            placed.push(Positioned {
                start: pos,
                length: tail_space.len(),
                chunk: TextChunk::new(tail_space.to_string(), common.clone()),
            });
        }

        Ok(TextBlock::new(
            placed.into_iter().map(|p| p.chunk).collect(),
            true,
        ))
    }
}

/// Wrap the accumulated chunks of one segment and move them to the output.
fn flush_segment(current: &mut Vec<TextChunk>, all: &mut Vec<TextChunk>, ids: &IdAllocator) {
    if current.is_empty() {
        return;
    }
    let span = Tag::with_attributes(
        "span",
        &[("class", "cx-segment"), ("data-segmentid", &ids.next_id())],
    )
    .shared();
    let wrapped = utils::add_common_tag(current, &span);
    utils::set_link_ids_in_place(&wrapped, ids);
    all.extend(wrapped);
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_boundaries(offsets: Vec<usize>) -> Box<dyn Fn(&str) -> Result<Vec<usize>, Error>> {
        Box::new(move |_| Ok(offsets.clone()))
    }

    #[test]
    fn offsets_are_consistent() {
        let block = TextBlock::new(
            vec![
                TextChunk::new("ab".to_string(), vec![]),
                TextChunk::new("cde".to_string(), vec![]),
                TextChunk::new("".to_string(), vec![]),
            ],
            true,
        );
        let offsets = block.offsets();
        assert_eq!(offsets[0].start, 0);
        assert_eq!(offsets[1].start, 2);
        assert_eq!(offsets[2].start, 5);
        for pair in offsets.windows(2) {
            assert_eq!(pair[0].start + pair[0].length, pair[1].start);
        }
        assert_eq!(block.get_plain_text(), "abcde");
    }

    #[test]
    fn common_tags_use_identity() {
        let shared = Tag::new("i").shared();
        let twin = Tag::new("i").shared();
        let block = TextBlock::new(
            vec![
                TextChunk::new("a".to_string(), vec![shared.clone()]),
                TextChunk::new("b".to_string(), vec![twin]),
            ],
            true,
        );
        // structurally equal but distinct records: no common prefix
        assert!(block.common_tags().is_empty());

        let block = TextBlock::new(
            vec![
                TextChunk::new("a".to_string(), vec![shared.clone()]),
                TextChunk::new("b".to_string(), vec![shared.clone()]),
            ],
            true,
        );
        assert_eq!(block.common_tags().len(), 1);
    }

    #[test]
    fn tag_offsets_skip_common_and_empty() {
        let outer = Tag::new("i").shared();
        let link = Tag::new("a").shared();
        let block = TextBlock::new(
            vec![
                TextChunk::new("one ".to_string(), vec![outer.clone()]),
                TextChunk::new("two".to_string(), vec![outer.clone(), link.clone()]),
                TextChunk::new("".to_string(), vec![outer.clone(), link]),
            ],
            true,
        );
        let offsets = block.get_tag_offsets();
        assert_eq!(offsets.len(), 1);
        assert_eq!(offsets[0].start, 4);
        assert_eq!(offsets[0].length, 3);
    }

    #[test]
    fn html_reopens_minimally() {
        let italic = Tag::new("i").shared();
        let bold = Tag::new("b").shared();
        let block = TextBlock::new(
            vec![
                TextChunk::new("a".to_string(), vec![italic.clone()]),
                TextChunk::new("b".to_string(), vec![italic.clone(), bold.clone()]),
                TextChunk::new("c".to_string(), vec![italic.clone()]),
            ],
            true,
        );
        assert_eq!(block.get_html(), "<i>a<b>b</b>c</i>");
    }

    #[test]
    fn html_escapes_text() {
        let block = TextBlock::new(vec![TextChunk::new("a < b".to_string(), vec![])], true);
        assert_eq!(block.get_html(), "a &#60; b");
    }

    #[test]
    fn html_renders_inline_empty_tags() {
        let img = Tag::self_closing("img").shared();
        let block = TextBlock::new(
            vec![TextChunk::with_inline_content(
                String::new(),
                vec![],
                InlineContent::Tag(img),
            )],
            false,
        );
        assert_eq!(block.get_html(), "<img />");
    }

    #[test]
    fn segment_splits_sentences() {
        let block = TextBlock::new(
            vec![TextChunk::new(
                "First sentence. Second sentence.".to_string(),
                vec![],
            )],
            true,
        );
        let ids = IdAllocator::new();
        let segmented = block.segment(&simple_boundaries(vec![16]), &ids).unwrap();
        assert_eq!(
            segmented.get_html(),
            "<span class=\"cx-segment\" data-segmentid=\"0\">First sentence. </span>\
             <span class=\"cx-segment\" data-segmentid=\"1\">Second sentence.</span>"
        );
        assert_eq!(segmented.get_plain_text(), "First sentence. Second sentence.");
    }

    #[test]
    fn segment_keeps_annotations() {
        let link = Tag::with_attributes("a", &[("href", "/wiki/Foo")]).shared();
        let block = TextBlock::new(
            vec![
                TextChunk::new("See ".to_string(), vec![]),
                TextChunk::new("Foo".to_string(), vec![link.clone()]),
                TextChunk::new(".".to_string(), vec![]),
            ],
            true,
        );
        let ids = IdAllocator::new();
        let segmented = block.segment(&simple_boundaries(vec![]), &ids).unwrap();
        assert_eq!(
            segmented.get_html(),
            "<span class=\"cx-segment\" data-segmentid=\"0\">See \
             <a href=\"/wiki/Foo\" class=\"cx-link\" data-linkid=\"1\">Foo</a>.</span>"
        );
    }

    #[test]
    fn segment_boundary_inside_annotation() {
        let italic = Tag::new("i").shared();
        let block = TextBlock::new(
            vec![TextChunk::new("One. Two.".to_string(), vec![italic])],
            true,
        );
        let ids = IdAllocator::new();
        let segmented = block.segment(&simple_boundaries(vec![5]), &ids).unwrap();
        assert_eq!(segmented.chunks().len(), 2);
        // the italic stays common, the segment spans nest inside it
        assert_eq!(
            segmented.get_html(),
            "<i><span class=\"cx-segment\" data-segmentid=\"0\">One. </span>\
             <span class=\"cx-segment\" data-segmentid=\"1\">Two.</span></i>"
        );
        assert_eq!(segmented.get_plain_text(), "One. Two.");
    }

    #[test]
    fn segment_preserves_zero_width_chunks() {
        let img = Tag::self_closing("img").shared();
        let block = TextBlock::new(
            vec![
                TextChunk::new("Fact.".to_string(), vec![]),
                TextChunk::with_inline_content(String::new(), vec![], InlineContent::Tag(img)),
            ],
            true,
        );
        let ids = IdAllocator::new();
        let segmented = block.segment(&simple_boundaries(vec![]), &ids).unwrap();
        assert_eq!(
            segmented.get_html(),
            "<span class=\"cx-segment\" data-segmentid=\"0\">Fact.<img /></span>"
        );
    }

    #[test]
    fn segment_leaves_transclusion_blocks_alone() {
        let transclusion = Tag::with_attributes("span", &[("typeof", "mw:Transclusion")]).shared();
        let block = TextBlock::new(
            vec![TextChunk::new("Stuff.".to_string(), vec![transclusion])],
            true,
        );
        let ids = IdAllocator::new();
        let segmented = block.segment(&simple_boundaries(vec![3]), &ids).unwrap();
        assert!(segmented.get_html().contains("Stuff."));
        assert!(!segmented.get_html().contains("cx-segment"));
    }

    #[test]
    fn translate_identity_projection() {
        let link = Tag::with_attributes("a", &[("href", "/x")]).shared();
        let block = TextBlock::new(
            vec![
                TextChunk::new("See ".to_string(), vec![]),
                TextChunk::new("Foo".to_string(), vec![link]),
                TextChunk::new(".".to_string(), vec![]),
            ],
            true,
        );
        let mappings: Vec<RangeMapping> = block
            .offsets()
            .iter()
            .filter(|offset| offset.length > 0)
            .map(|offset| RangeMapping {
                source: CharRange::new(offset.start, offset.length),
                target: CharRange::new(offset.start, offset.length),
            })
            .collect();
        let translated = block
            .translate_tags(&block.get_plain_text(), &mappings)
            .unwrap();
        assert_eq!(translated.get_plain_text(), block.get_plain_text());
        assert_eq!(translated.chunks().len(), block.chunks().len());
        for (a, b) in translated.chunks().iter().zip(block.chunks().iter()) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.tags.len(), b.tags.len());
            for (x, y) in a.tags.iter().zip(b.tags.iter()) {
                assert!(Rc::ptr_eq(x, y));
            }
        }
    }

    #[test]
    fn translate_fills_gaps_and_tail() {
        let bold = Tag::new("b").shared();
        let block = TextBlock::new(
            vec![
                TextChunk::new("alpha".to_string(), vec![bold.clone()]),
                TextChunk::new(" beta".to_string(), vec![]),
            ],
            true,
        );
        // only the bold word is mapped; the rest becomes common-tag text
        let mappings = [RangeMapping {
            source: CharRange::new(0, 5),
            target: CharRange::new(0, 4),
        }];
        let translated = block.translate_tags("ALFA and more  ", &mappings).unwrap();
        assert_eq!(translated.get_plain_text(), "ALFA and more  ");
        assert_eq!(translated.chunks()[0].text, "ALFA");
        assert!(Rc::ptr_eq(&translated.chunks()[0].tags[0], &bold));
        // gap text, then trailing whitespace as its own chunk
        assert_eq!(translated.chunks()[1].text, " and more");
        assert_eq!(translated.chunks().last().unwrap().text, "  ");
    }

    #[test]
    fn translate_moves_empty_chunks() {
        let ref_tag = Tag::new("sup").shared();
        let block = TextBlock::new(
            vec![
                TextChunk::new("Fact.".to_string(), vec![]),
                TextChunk::with_inline_content(
                    String::new(),
                    vec![],
                    InlineContent::Tag(ref_tag),
                ),
            ],
            true,
        );
        let mappings = [RangeMapping {
            source: CharRange::new(0, 5),
            target: CharRange::new(0, 7),
        }];
        let translated = block.translate_tags("Tosiasi", &mappings).unwrap();
        assert_eq!(translated.chunks().len(), 2);
        assert!(translated.chunks()[1].inline_content.is_some());
    }

    #[test]
    fn translate_rejects_overlaps() {
        let block = TextBlock::new(
            vec![TextChunk::new("abcdef".to_string(), vec![])],
            true,
        );
        let mappings = [
            RangeMapping {
                source: CharRange::new(0, 3),
                target: CharRange::new(0, 4),
            },
            RangeMapping {
                source: CharRange::new(3, 3),
                target: CharRange::new(2, 3),
            },
        ];
        assert!(matches!(
            block.translate_tags("abcdef", &mappings),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn root_item_detection() {
        let plain = TextBlock::new(vec![TextChunk::new("text".to_string(), vec![])], true);
        assert!(plain.get_root_item().is_none());

        let tag = Tag::new("a").shared();
        let tagged = TextBlock::new(
            vec![TextChunk::new("text".to_string(), vec![tag.clone()])],
            true,
        );
        assert!(Rc::ptr_eq(&tagged.get_root_item().unwrap(), &tag));

        // leading whitespace chunks are skipped
        let spaced = TextBlock::new(
            vec![
                TextChunk::new("  ".to_string(), vec![]),
                TextChunk::new("text".to_string(), vec![tag.clone()]),
            ],
            true,
        );
        assert!(Rc::ptr_eq(&spaced.get_root_item().unwrap(), &tag));
    }
}
