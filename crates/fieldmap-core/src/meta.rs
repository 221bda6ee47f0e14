//! Per-mapping-type field registry.
//!
//! Fields are bucketed by the source key they read, so one source value can be
//! rendered under several declared names. Declared names are unique; declaring
//! a name again replaces its field (last write wins) while its slot in the
//! declared order stays where it was first declared.

use crate::field::Field;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// One registered field under its declared name.
pub type Entry = (String, Arc<Field>);

/// Ordered, override-aware registry of declared fields.
///
/// Cloning is a structural copy: independent buckets and declared order, with
/// the field descriptors shared.
#[derive(Debug, Clone, Default)]
pub struct Meta {
    buckets: IndexMap<Option<String>, Vec<Entry>>,
    field_names: Vec<String>,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `field` under `name`.
    ///
    /// A keyed field without a source key gets `name` as its key. A name that
    /// is already registered loses its previous entry, wherever it lived.
    /// A keyed field shared under a second name keeps the key it got first.
    pub fn register(&mut self, name: impl Into<String>, field: impl Into<Arc<Field>>) {
        let name = name.into();
        let field = field.into();

        if matches!(field.is_nonkey(), Ok(false)) {
            field.assign_key(&name);
        }

        if self.field_names.contains(&name) {
            self.remove_entry(&name);
            debug!(field = %name, key = ?field.source_key(), "overriding declared field");
        } else {
            self.field_names.push(name.clone());
        }

        let key = field.source_key().map(ToOwned::to_owned);
        trace!(field = %name, key = ?key, "registered field");
        self.buckets.entry(key).or_default().push((name, field));
    }

    /// Fold every field of `other` into `self`, in `other`'s declared order.
    pub fn merge_from(&mut self, other: &Meta) {
        for name in &other.field_names {
            if let Some(field) = other.get(name) {
                self.register(name.clone(), Arc::clone(field));
            }
        }
    }

    fn remove_entry(&mut self, name: &str) {
        let Some(bucket) = self
            .buckets
            .values()
            .position(|entries| entries.iter().any(|(n, _)| n == name))
        else {
            return;
        };
        let emptied = match self.buckets.get_index_mut(bucket) {
            Some((_, entries)) => {
                entries.retain(|(n, _)| n != name);
                entries.is_empty()
            }
            None => false,
        };
        if emptied {
            self.buckets.shift_remove_index(bucket);
        }
    }

    /// Buckets in registration order: source key and the entries reading it.
    ///
    /// Non-keyed fields share the `None` bucket.
    pub fn buckets(&self) -> impl Iterator<Item = (Option<&str>, &[Entry])> {
        self.buckets
            .iter()
            .map(|(key, entries)| (key.as_deref(), entries.as_slice()))
    }

    /// Declared names in declared order.
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Rank of a declared name in the declared order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.field_names.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// The field currently registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<Field>> {
        self.buckets
            .values()
            .flatten()
            .find(|(n, _)| n == name)
            .map(|(_, field)| field)
    }

    /// Declared names with their fields, in declared order.
    pub fn entries(&self) -> Vec<(&str, &Arc<Field>)> {
        self.field_names
            .iter()
            .filter_map(|name| self.get(name).map(|field| (name.as_str(), field)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.field_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field_names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket_names<'a>(meta: &'a Meta, key: Option<&str>) -> Vec<&'a str> {
        meta.buckets()
            .find(|(k, _)| *k == key)
            .map(|(_, entries)| entries.iter().map(|(n, _)| n.as_str()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn register_assigns_missing_key_from_name() {
        let mut meta = Meta::new();
        meta.register("spam", Field::raw());
        meta.register("egg", Field::raw().key("bacon"));
        assert_eq!(meta.get("spam").unwrap().source_key(), Some("spam"));
        assert_eq!(meta.get("egg").unwrap().source_key(), Some("bacon"));
        assert_eq!(meta.field_names(), ["spam", "egg"]);
    }

    #[test]
    fn non_key_fields_share_the_unkeyed_bucket() {
        let mut meta = Meta::new();
        meta.register("a", Field::non_key());
        meta.register("b", Field::stub(1));
        assert_eq!(meta.get("a").unwrap().source_key(), None);
        assert_eq!(bucket_names(&meta, None), ["a", "b"]);
    }

    #[test]
    fn one_source_key_can_feed_several_names() {
        let mut meta = Meta::new();
        meta.register("upper", Field::raw().key("name"));
        meta.register("lower", Field::raw().key("name"));
        assert_eq!(bucket_names(&meta, Some("name")), ["upper", "lower"]);
        assert_eq!(meta.len(), 2);
    }

    #[test]
    fn redeclaring_moves_bucket_but_keeps_declared_slot() {
        let mut meta = Meta::new();
        meta.register("foo", Field::raw().key("x"));
        meta.register("bar", Field::raw().key("z"));
        meta.register("foo", Field::raw().key("y"));

        assert_eq!(meta.field_names(), ["foo", "bar"]);
        assert_eq!(meta.position("foo"), Some(0));
        assert_eq!(meta.get("foo").unwrap().source_key(), Some("y"));
        // The emptied "x" bucket is pruned.
        let keys: Vec<Option<&str>> = meta.buckets().map(|(k, _)| k).collect();
        assert_eq!(keys, [Some("z"), Some("y")]);
    }

    #[test]
    fn merge_and_override_leave_the_source_untouched() {
        let mut base = Meta::new();
        base.register("foo", Field::raw().key("x"));
        base.register("keep", Field::raw());

        let mut derived = Meta::new();
        derived.merge_from(&base.clone());
        derived.register("foo", Field::raw().key("y"));

        assert_eq!(derived.get("foo").unwrap().source_key(), Some("y"));
        assert_eq!(derived.entries().len(), 2);
        assert_eq!(base.get("foo").unwrap().source_key(), Some("x"));
        assert_eq!(bucket_names(&base, Some("x")), ["foo"]);
    }

    #[test]
    fn shared_field_keeps_its_first_key() {
        let shared = Arc::new(Field::raw());
        let mut meta = Meta::new();
        meta.register("first", Arc::clone(&shared));
        meta.register("second", Arc::clone(&shared));
        assert_eq!(meta.get("second").unwrap().source_key(), Some("first"));
        assert_eq!(bucket_names(&meta, Some("first")), ["first", "second"]);
    }

    #[test]
    fn clone_shares_descriptors() {
        let mut meta = Meta::new();
        meta.register("spam", Field::raw());
        let copy = meta.clone();
        assert!(Arc::ptr_eq(
            meta.get("spam").unwrap(),
            copy.get("spam").unwrap()
        ));
    }
}
