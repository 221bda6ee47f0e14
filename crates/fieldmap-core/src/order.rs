//! Key ordering helpers for result records.

use crate::value::Record;

/// Stable-sort `record` by each key's position in `keys`.
///
/// Keys absent from `keys` rank before all listed keys and keep their
/// relative order.
pub fn sort_record_with_keys<K: AsRef<str>>(mut record: Record, keys: &[K]) -> Record {
    let rank = |key: &str| keys.iter().position(|k| k.as_ref() == key);
    record.sort_by(|a, _, b, _| rank(a.as_str()).cmp(&rank(b.as_str())));
    record
}
