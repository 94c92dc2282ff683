//! Attribute records backing the lazy cache.

use crate::resource::Page;
use std::fmt;

/// A record of attribute slots for one resource type.
///
/// Implemented through the `attributes!` macro for flat records; composite
/// records (media) implement it by delegation.
pub trait Attributes: Clone + Default + fmt::Debug + Send + 'static {
    /// Names the individual slots.
    type Attribute: Copy + fmt::Debug + Send + Sync + 'static;

    /// Dispatch table: the page whose fetch routine populates `attribute`.
    fn page(attribute: Self::Attribute) -> Page;

    /// Merge a freshly parsed record; present values overwrite cached ones.
    fn merge(&mut self, other: Self);

    /// Merge a seed record; only unset slots are filled.
    fn fill(&mut self, other: Self);
}

attributes! {
    /// Attribute record for resources that only carry a display name.
    pub struct NameAttributes: NameAttribute {
        name: String => Name @ Main,
    }
}

impl NameAttributes {
    pub(crate) fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overwrites_present_values() {
        let mut cached = NameAttributes::named("Old");
        cached.merge(NameAttributes::named("New"));
        assert_eq!(cached.name.as_deref(), Some("New"));

        cached.merge(NameAttributes::default());
        assert_eq!(cached.name.as_deref(), Some("New"));
    }

    #[test]
    fn test_fill_keeps_existing_values() {
        let mut cached = NameAttributes::named("Loaded");
        cached.fill(NameAttributes::named("Seed"));
        assert_eq!(cached.name.as_deref(), Some("Loaded"));

        let mut empty = NameAttributes::default();
        empty.fill(NameAttributes::named("Seed"));
        assert_eq!(empty.name.as_deref(), Some("Seed"));
    }

    #[test]
    fn test_dispatch_table() {
        assert_eq!(NameAttributes::page(NameAttribute::Name), Page::Main);
    }
}
