//! Per-mapping-type hooks, keyed by declared field name.

use crate::error::MapperError;
use crate::field::Field;
use crate::mapper::Mapper;
use crate::value::{Record, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub type FilterFn = Arc<dyn Fn(&Mapper<'_>, Value) -> Result<Value, MapperError> + Send + Sync>;
pub type SupplyFn = Arc<dyn Fn(&Mapper<'_>) -> Result<Value, MapperError> + Send + Sync>;
pub type AttachFn =
    Arc<dyn Fn(&Mapper<'_>, &mut Record, Value) -> Result<(), MapperError> + Send + Sync>;
pub type OrderFn = Arc<dyn Fn(&Mapper<'_>, Record) -> Result<Record, MapperError> + Send + Sync>;
pub type KeyNameFn = Arc<dyn Fn(&Mapper<'_>, &str, &Value, &Field) -> String + Send + Sync>;

/// The value-replacing hook run between extraction and conversion.
#[derive(Clone)]
pub enum FieldFilter {
    /// Receives the extracted value (`Null` for non-keyed fields).
    Filter(FilterFn),
    /// Takes no value; its result becomes the field's value.
    Supply(SupplyFn),
}

impl FieldFilter {
    pub(crate) fn apply(&self, mapper: &Mapper<'_>, value: Value) -> Result<Value, MapperError> {
        match self {
            Self::Filter(f) => f(mapper, value),
            Self::Supply(f) => f(mapper),
        }
    }
}

/// Hook table of a mapping type.
#[derive(Clone, Default)]
pub struct Hooks {
    filters: BTreeMap<String, FieldFilter>,
    after_filters: BTreeMap<String, FilterFn>,
    attachers: BTreeMap<String, AttachFn>,
    order: Option<OrderFn>,
    key_name: Option<KeyNameFn>,
}

impl Hooks {
    pub fn filter(&self, name: &str) -> Option<&FieldFilter> {
        self.filters.get(name)
    }

    pub fn after_filter(&self, name: &str) -> Option<&FilterFn> {
        self.after_filters.get(name)
    }

    pub fn attach(&self, name: &str) -> Option<&AttachFn> {
        self.attachers.get(name)
    }

    pub fn order(&self) -> Option<&OrderFn> {
        self.order.as_ref()
    }

    pub fn key_name(&self) -> Option<&KeyNameFn> {
        self.key_name.as_ref()
    }

    pub(crate) fn set_filter(&mut self, name: String, filter: FieldFilter) {
        self.filters.insert(name, filter);
    }

    pub(crate) fn set_after_filter(&mut self, name: String, f: FilterFn) {
        self.after_filters.insert(name, f);
    }

    pub(crate) fn set_attach(&mut self, name: String, f: AttachFn) {
        self.attachers.insert(name, f);
    }

    pub(crate) fn set_order(&mut self, f: OrderFn) {
        self.order = Some(f);
    }

    pub(crate) fn set_key_name(&mut self, f: KeyNameFn) {
        self.key_name = Some(f);
    }

    /// Overlay `other` on `self`; hooks in `other` win.
    pub(crate) fn merge_from(&mut self, other: &Hooks) {
        self.filters
            .extend(other.filters.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.after_filters
            .extend(other.after_filters.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.attachers
            .extend(other.attachers.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(order) = &other.order {
            self.order = Some(Arc::clone(order));
        }
        if let Some(key_name) = &other.key_name {
            self.key_name = Some(Arc::clone(key_name));
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .field("after_filters", &self.after_filters.keys().collect::<Vec<_>>())
            .field("attachers", &self.attachers.keys().collect::<Vec<_>>())
            .field("order", &self.order.is_some())
            .field("key_name", &self.key_name.is_some())
            .finish()
    }
}
