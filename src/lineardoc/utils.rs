//! Tag classification and HTML rendering helpers.
use std::rc::Rc;

use super::chunk::TextChunk;
use super::doc::IdAllocator;
use super::tag::{Tag, TagRef};

/// HTML void elements; they never carry content and close themselves.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Escape text for inclusion in HTML, outside of a tag.
pub fn esc(text: &str) -> String {
    text.replace('&', "&#38;")
        .replace('<', "&#60;")
        .replace('>', "&#62;")
}

/// Escape an attribute value for inclusion in a double-quoted attribute.
pub fn esc_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' | '\'' | '&' | '<' | '>' => out.push_str(&format!("&#{};", c as u32)),
            _ => out.push(c),
        }
    }
    out
}

/// Render an open tag, attributes in insertion order.
pub fn get_open_tag_html(tag: &Tag) -> String {
    let mut html = String::new();
    html.push('<');
    html.push_str(&esc(tag.name()));
    for (name, value) in tag.attributes().iter() {
        html.push(' ');
        html.push_str(&esc(name));
        html.push_str("=\"");
        html.push_str(&esc_attr(value));
        html.push('"');
    }
    if tag.is_self_closing() {
        html.push_str(" /");
    }
    html.push('>');
    html
}

/// Render a close tag; self-closing tags render nothing.
pub fn get_close_tag_html(tag: &Tag) -> String {
    if tag.is_self_closing() {
        return String::new();
    }
    format!("</{}>", esc(tag.name()))
}

/// A wiki reference span: `mw:Extension/ref`, `mw:Cite/Footnote` or
/// `mw:Reference` in the RDFa type.
pub fn is_reference(tag: &Tag) -> bool {
    tag.has_attr_token("typeof", "mw:Extension/ref")
        || tag.has_attr_token("typeof", "mw:Cite/Footnote")
        || tag.has_attr_token("typeof", "mw:Reference")
}

pub fn is_math(tag: &Tag) -> bool {
    tag.name() == "math" || tag.has_attr_token("typeof", "mw:Extension/math")
}

pub fn is_transclusion(tag: &Tag) -> bool {
    tag.has_attr_token("typeof", "mw:Transclusion")
}

/// A fragment of an already-seen transclusion, marked by an `about`
/// attribute pointing at a `#mwt...` id.
pub fn is_transclusion_fragment(tag: &Tag) -> bool {
    tag.attr("about")
        .map(|about| about.starts_with("#mwt"))
        .unwrap_or(false)
}

pub fn is_external_link(tag: &Tag) -> bool {
    tag.has_attr_token("rel", "mw:ExtLink")
}

pub fn is_segment(tag: &Tag) -> bool {
    tag.has_attr("data-segmentid")
}

pub fn is_gallery(tag: &Tag) -> bool {
    tag.has_attr_token("class", "gallery")
}

pub fn is_inline_empty_tag(tag_name: &str) -> bool {
    VOID_ELEMENTS.contains(&tag_name)
}

/// A top-level section marker emitted by the wiki renderer.
pub fn is_section_marker(tag: &Tag) -> bool {
    tag.name() == "section" && tag.has_attr("data-mw-section-id")
}

/// A category link: `<link rel="mw:PageProp/Category">` with no `about`.
pub fn is_category(tag: &Tag) -> bool {
    tag.name() == "link"
        && tag.has_attr_token("rel", "mw:PageProp/Category")
        && !tag.has_attr("about")
}

/// A link whose target survives translation: an anchor with an `href` that
/// is not a transclusion fragment.
pub fn is_translatable_link(tag: &Tag) -> bool {
    tag.name() == "a" && tag.has_attr("href") && !is_transclusion_fragment(tag)
}

/// Find the boundaries that lie strictly inside each chunk.
///
/// Boundaries lying between chunks belong to the latest chunk possible;
/// boundaries at the very start or the very end of the block are dropped.
/// Returns one (possibly empty) boundary list per chunk.
pub fn get_chunk_boundary_groups(boundaries: &[usize], chunks: &[TextChunk]) -> Vec<Vec<usize>> {
    let mut sorted = boundaries.to_vec();
    sorted.sort_unstable();
    let mut pointer = sorted.iter().take_while(|b| **b == 0).count();

    let mut groups = Vec::with_capacity(chunks.len());
    let mut offset = 0usize;
    for chunk in chunks {
        let length = chunk.text.len();
        let mut group = Vec::new();
        while pointer < sorted.len() {
            let boundary = sorted[pointer];
            if length == 0 || boundary > offset + length - 1 {
                // beyond the interior of this chunk
                break;
            }
            group.push(boundary);
            pointer += 1;
        }
        offset += length;
        groups.push(group);
    }
    groups
}

/// Add a tag to consecutive chunks, above their common tags but below the
/// distinct ones. Returns copies of the chunks.
pub fn add_common_tag(chunks: &[TextChunk], tag: &TagRef) -> Vec<TextChunk> {
    if chunks.is_empty() {
        return Vec::new();
    }

    let mut common = chunks[0].tags.clone();
    for chunk in &chunks[1..] {
        let matching = common
            .iter()
            .zip(chunk.tags.iter())
            .take_while(|(a, b)| Rc::ptr_eq(a, b))
            .count();
        common.truncate(matching);
    }
    let depth = common.len();

    chunks
        .iter()
        .map(|chunk| {
            let mut tags = chunk.tags.clone();
            tags.insert(depth, tag.clone());
            TextChunk {
                text: chunk.text.clone(),
                tags,
                inline_content: chunk.inline_content.clone(),
            }
        })
        .collect()
}

/// Assign link ids to every translatable link in the chunks' tag stacks,
/// in place. The query string is stripped from the target and the link is
/// reclassed as `cx-link`.
pub fn set_link_ids_in_place(chunks: &[TextChunk], ids: &IdAllocator) {
    for chunk in chunks {
        for tag in &chunk.tags {
            if !is_translatable_link(tag) || tag.has_attr("data-linkid") {
                continue;
            }
            if let Some(href) = tag.attr("href") {
                if let Some(base) = href.split('?').next() {
                    tag.set_attr("href", base);
                }
            }
            tag.set_attr("class", "cx-link");
            tag.set_attr("data-linkid", &ids.next_id());
        }
    }
}
