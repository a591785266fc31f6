//! Component tags

use std::borrow::{Borrow, Cow};
use std::fmt;

/// Identifies a component type within an entity. An entity holds at most one
/// component per tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(Cow<'static, str>);

impl Tag {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Tag usable in `const` items, e.g. `const HP: Tag = Tag::from_static("hp");`
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Tag {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl From<&Tag> for Tag {
    fn from(tag: &Tag) -> Self {
        tag.clone()
    }
}

impl Borrow<str> for Tag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HP: Tag = Tag::from_static("hp");

    #[test]
    fn test_static_and_owned_tags_compare_equal() {
        assert_eq!(HP, Tag::from(String::from("hp")));
        assert_eq!(HP.to_string(), "hp");
        assert_ne!(HP, Tag::new("name"));
    }
}
