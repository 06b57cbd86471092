//! Shared tag records.
//!
//! Tags are reference counted and carry their attribute map behind a
//! [RefCell]: a chunk's tag snapshot points at the same records as the live
//! annotation stack, so attributes attached by later passes (`data-linkid`,
//! `data-segmentid`) are visible in every chunk holding the tag. Identity
//! comparisons go through [Rc::ptr_eq].
use std::cell::{Ref, RefCell};
use std::rc::Rc;

pub type TagRef = Rc<Tag>;

/// Ordered attribute map. Insertion order is preserved for stable
/// serialization; lookups are linear, which is fine at tag-attribute sizes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Attributes::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Updates an existing entry in place, or appends a new one.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

#[derive(Debug)]
pub struct Tag {
    name: String,
    attributes: RefCell<Attributes>,
    self_closing: bool,
}

impl Tag {
    pub fn new(name: &str) -> Tag {
        Tag {
            name: name.to_string(),
            attributes: RefCell::new(Attributes::new()),
            self_closing: false,
        }
    }

    pub fn with_attributes(name: &str, attributes: &[(&str, &str)]) -> Tag {
        let tag = Tag::new(name);
        for (key, value) in attributes {
            tag.set_attr(key, value);
        }
        tag
    }

    pub fn self_closing(name: &str) -> Tag {
        Tag {
            self_closing: true,
            ..Tag::new(name)
        }
    }

    pub fn set_self_closing(mut self, self_closing: bool) -> Tag {
        self.self_closing = self_closing;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    pub fn attributes(&self) -> Ref<Attributes> {
        self.attributes.borrow()
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.attributes.borrow().get(name).map(str::to_string)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.borrow().has(name)
    }

    /// Whitespace-separated tokens of an attribute value, e.g. RDFa `typeof`.
    pub fn attr_tokens(&self, name: &str) -> Vec<String> {
        self.attributes
            .borrow()
            .get(name)
            .map(|value| value.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_attr_token(&self, name: &str, token: &str) -> bool {
        self.attributes
            .borrow()
            .get(name)
            .map(|value| value.split_whitespace().any(|t| t == token))
            .unwrap_or(false)
    }

    pub fn set_attr(&self, name: &str, value: &str) {
        self.attributes.borrow_mut().set(name, value);
    }

    pub fn remove_attr(&self, name: &str) -> Option<String> {
        self.attributes.borrow_mut().remove(name)
    }

    /// A detached copy: same name and flags, a fresh attribute map.
    pub fn clone_tag(&self) -> Tag {
        Tag {
            name: self.name.clone(),
            attributes: RefCell::new(self.attributes.borrow().clone()),
            self_closing: self.self_closing,
        }
    }

    pub fn shared(self) -> TagRef {
        Rc::new(self)
    }
}

impl PartialEq for Tag {
    /// Value equality; attribute order matters. Identity comparisons use
    /// [Rc::ptr_eq] instead.
    fn eq(&self, other: &Tag) -> bool {
        self.name == other.name
            && self.self_closing == other.self_closing
            && *self.attributes.borrow() == *other.attributes.borrow()
    }
}
