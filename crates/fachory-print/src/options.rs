// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job option sets.
//
// An `OptionSet` is an ordered list of (key, value) pairs.  Adding a key that
// is already present replaces its value in place, so the set never holds two
// entries for the same key and first-insertion order is kept.

use fachory_core::config::PrintDefaults;

use crate::spooler::DestinationDescriptor;

/// `media` option key (paper size or roll keyword).
pub const MEDIA: &str = "media";
/// `sides` option key (duplex mode).
pub const SIDES: &str = "sides";
/// `orientation-requested` option key.
pub const ORIENTATION_REQUESTED: &str = "orientation-requested";

/// Ordered key/value print options owned by a single value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet {
    options: Vec<(String, String)>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the default job options.
    ///
    /// Order: paper-size media, one-sided (or configured) sides, roll media
    /// (replacing the paper-size value when configured), orientation.
    pub fn defaults(defaults: &PrintDefaults) -> Self {
        let mut set = Self::new();
        set.add(MEDIA, defaults.paper_size.media_keyword());
        set.add(SIDES, defaults.duplex.sides_keyword());
        if let Some(roll) = &defaults.roll_media {
            set.add(MEDIA, roll.as_str());
        }
        set.add(
            ORIENTATION_REQUESTED,
            defaults.orientation.enum_value().to_string(),
        );
        set
    }

    /// Defaults merged with the options stored on `dest`.  Values stored on
    /// the destination win.
    pub fn for_destination(defaults: &PrintDefaults, dest: &DestinationDescriptor) -> Self {
        let mut set = Self::defaults(defaults);
        for (key, value) in &dest.options {
            set.add(key.as_str(), value.as_str());
        }
        set
    }

    /// Insert or replace `key`; returns the number of options afterwards.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) -> usize {
        let key = key.into();
        let value = value.into();
        match self.options.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.options.push((key, value)),
        }
        self.options.len()
    }

    /// Builder-style [`add`](Self::add).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OptionSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.add(k, v);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fachory_core::types::{Orientation, PaperSize};

    #[test]
    fn defaults_use_roll_media_in_first_media_slot() {
        let set = OptionSet::defaults(&PrintDefaults::default());
        let pairs: Vec<_> = set.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("media", "Roll80mm"),
                ("sides", "one-sided"),
                ("orientation-requested", "3"),
            ]
        );
    }

    #[test]
    fn defaults_without_roll_keep_paper_size() {
        let defaults = PrintDefaults {
            paper_size: PaperSize::A4,
            orientation: Orientation::Landscape,
            roll_media: None,
            ..PrintDefaults::default()
        };
        let set = OptionSet::defaults(&defaults);
        assert_eq!(set.get(MEDIA), Some("iso_a4_210x297mm"));
        assert_eq!(set.get(ORIENTATION_REQUESTED), Some("4"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn destination_options_override_and_extend() {
        let dest = DestinationDescriptor::new("desk1")
            .with_option("sides", "two-sided-long-edge")
            .with_option("print-quality", "5");
        let set = OptionSet::for_destination(&PrintDefaults::default(), &dest);
        assert_eq!(set.get(SIDES), Some("two-sided-long-edge"));
        assert_eq!(set.get("print-quality"), Some("5"));
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn merged_set_does_not_alias_destination_storage() {
        let mut dest = DestinationDescriptor::new("desk1").with_option("media", "Roll58mm");
        let set = OptionSet::for_destination(&PrintDefaults::default(), &dest);
        dest.options[0].1 = "Roll80mm".into();
        assert_eq!(set.get(MEDIA), Some("Roll58mm"));
    }

    #[test]
    fn add_replaces_in_place() {
        let mut set = OptionSet::new();
        assert_eq!(set.add("a", "1"), 1);
        assert_eq!(set.add("b", "2"), 2);
        assert_eq!(set.add("a", "3"), 2);
        let keys: Vec<_> = set.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(set.get("a"), Some("3"));
    }
}
