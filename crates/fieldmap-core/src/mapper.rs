//! Mapping types and the resolution engine.
//!
//! A [`MapperDef`] is declared once through [`MapperBuilder`]: ancestors are
//! folded in declaration order, then the type's own fields and hooks are
//! registered on top. A [`Mapper`] binds a definition to one source value and a
//! configuration, and [`Mapper::resolve`] walks the declared fields:
//!
//! ```text
//! extract (dotted path, list-first-match)
//!     → invoke callable
//!     → filter / supply hook
//!     → field conversion
//!     → after-filter hook
//!     → attach hook | flatten into parent | insert under key_name
//! then order(result)
//! ```

use crate::error::MapperError;
use crate::field::Field;
use crate::hooks::{FieldFilter, Hooks};
use crate::meta::Meta;
use crate::order::sort_record_with_keys;
use crate::value::{Record, Value};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, trace_span};

/// Named configuration values visible to hooks and forwarded to delegates.
pub type Config = IndexMap<String, Value>;

/// A declared mapping type.
pub struct MapperDef {
    name: String,
    meta: Meta,
    hooks: Hooks,
    default_options: Config,
}

impl MapperDef {
    pub fn builder(name: impl Into<String>) -> MapperBuilder {
        MapperBuilder {
            name: name.into(),
            parents: Vec::new(),
            fields: Vec::new(),
            hooks: Hooks::default(),
            default_options: Config::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn default_options(&self) -> &Config {
        &self.default_options
    }

    /// Resolve `data` with the default configuration.
    pub fn map(&self, data: impl Into<Value>) -> Result<Record, MapperError> {
        Mapper::new(self, data).resolve()
    }
}

impl fmt::Debug for MapperDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapperDef")
            .field("name", &self.name)
            .field("fields", &self.meta.field_names())
            .field("hooks", &self.hooks)
            .finish()
    }
}

/// Declaration of a mapping type.
pub struct MapperBuilder {
    name: String,
    parents: Vec<Arc<MapperDef>>,
    fields: Vec<(String, Field)>,
    hooks: Hooks,
    default_options: Config,
}

impl MapperBuilder {
    /// Inherit from `parent`. Later parents override earlier ones.
    pub fn extends(mut self, parent: &Arc<MapperDef>) -> Self {
        self.parents.push(Arc::clone(parent));
        self
    }

    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    /// Declare several fields at once, e.g. ones derived from an external schema.
    pub fn fields(mut self, fields: impl IntoIterator<Item = (String, Field)>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Replace the extracted value of `name` before conversion.
    pub fn filter<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Mapper<'_>, Value) -> Result<Value, MapperError> + Send + Sync + 'static,
    {
        self.hooks
            .set_filter(name.into(), FieldFilter::Filter(Arc::new(f)));
        self
    }

    /// Produce the value of `name` from nothing; the way non-keyed fields get data.
    pub fn supply<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Mapper<'_>) -> Result<Value, MapperError> + Send + Sync + 'static,
    {
        self.hooks
            .set_filter(name.into(), FieldFilter::Supply(Arc::new(f)));
        self
    }

    pub fn after_filter<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Mapper<'_>, Value) -> Result<Value, MapperError> + Send + Sync + 'static,
    {
        self.hooks.set_after_filter(name.into(), Arc::new(f));
        self
    }

    /// Take over placement of `name` in the result.
    pub fn attach<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Mapper<'_>, &mut Record, Value) -> Result<(), MapperError> + Send + Sync + 'static,
    {
        self.hooks.set_attach(name.into(), Arc::new(f));
        self
    }

    pub fn order<F>(mut self, f: F) -> Self
    where
        F: Fn(&Mapper<'_>, Record) -> Result<Record, MapperError> + Send + Sync + 'static,
    {
        self.hooks.set_order(Arc::new(f));
        self
    }

    pub fn key_name<F>(mut self, f: F) -> Self
    where
        F: Fn(&Mapper<'_>, &str, &Value, &Field) -> String + Send + Sync + 'static,
    {
        self.hooks.set_key_name(Arc::new(f));
        self
    }

    pub fn default_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.default_options.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Arc<MapperDef> {
        let mut meta = Meta::new();
        let mut hooks = Hooks::default();
        let mut default_options = Config::new();

        for (index, parent) in self.parents.iter().enumerate() {
            // The first ancestor's registry is copied as is, bucket order included.
            if index == 0 {
                meta = parent.meta.clone();
            } else {
                meta.merge_from(&parent.meta);
            }
            hooks.merge_from(&parent.hooks);
            default_options.extend(
                parent
                    .default_options
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
        }
        for (name, field) in self.fields {
            meta.register(name, field);
        }
        hooks.merge_from(&self.hooks);
        default_options.extend(self.default_options);

        debug!(
            mapper = %self.name,
            parents = self.parents.len(),
            fields = meta.len(),
            "built mapping type"
        );
        Arc::new(MapperDef {
            name: self.name,
            meta,
            hooks,
            default_options,
        })
    }
}

/// A mapping type bound to a source value and configuration.
pub struct Mapper<'a> {
    def: &'a MapperDef,
    data: Value,
    options: Config,
}

impl<'a> Mapper<'a> {
    pub fn new(def: &'a MapperDef, data: impl Into<Value>) -> Self {
        Self::with_options(def, data, Config::new())
    }

    /// Bind with `overrides` merged over the type's default configuration.
    pub fn with_options(def: &'a MapperDef, data: impl Into<Value>, overrides: Config) -> Self {
        let mut options = def.default_options.clone();
        options.extend(overrides);
        Self {
            def,
            data: data.into(),
            options,
        }
    }

    /// Builder-style single configuration override.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn def(&self) -> &'a MapperDef {
        self.def
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn options(&self) -> &Config {
        &self.options
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// A fresh instance of `target` over `data`, sharing this configuration.
    pub fn delegate<'b>(&self, target: &'b MapperDef, data: Value) -> Mapper<'b> {
        Mapper::with_options(target, data, self.options.clone())
    }

    /// Produce the ordered result record.
    pub fn resolve(&self) -> Result<Record, MapperError> {
        let _span = trace_span!("resolve", mapper = %self.def.name).entered();
        let mut parsed = Record::new();
        for (key, entries) in self.def.meta.buckets() {
            for (name, field) in entries {
                let value = self.resolve_field(key, name, field)?;
                self.place(&mut parsed, name, field, value)?;
            }
        }
        self.order(parsed)
    }

    fn resolve_field(
        &self,
        key: Option<&str>,
        name: &str,
        field: &Field,
    ) -> Result<Value, MapperError> {
        let mut value = if field.is_nonkey()? {
            Value::Null
        } else {
            self.extract_source(key)?
        };
        if !field.skips_callable() {
            value = value.invoke();
        }
        if let Some(filter) = self.def.hooks.filter(name) {
            value = filter.apply(self, value)?;
        }
        let mut value = field.resolve_value(self, name, value)?;
        if let Some(after_filter) = self.def.hooks.after_filter(name) {
            value = after_filter(self, value)?;
        }
        trace!(field = %name, value = ?value, "resolved field");
        Ok(value)
    }

    /// Read `key` from the bound data; a sequence yields its first element
    /// that has the key.
    fn extract_source(&self, key: Option<&str>) -> Result<Value, MapperError> {
        let Some(key) = key else {
            return Ok(Value::Null);
        };
        let Value::List(items) = &self.data else {
            return self.extract(&self.data, key);
        };

        let mut last_error = None;
        for (index, item) in items.iter().enumerate() {
            match self.extract(item, key) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_data_error() => {
                    trace!(key, index, "source element lacks key");
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_error.unwrap_or_else(|| self.data_error(&self.data, key)))
    }

    /// Extract `key` from `obj`. Dotted keys descend one segment at a time,
    /// invoking callable intermediates.
    pub fn extract(&self, obj: &Value, key: &str) -> Result<Value, MapperError> {
        match key.split_once('.') {
            Some((head, rest)) => {
                let child = self.extract(obj, head)?.invoke();
                self.extract(&child, rest)
            }
            None => self.lookup(obj, key),
        }
    }

    fn lookup(&self, obj: &Value, key: &str) -> Result<Value, MapperError> {
        if key.is_empty() {
            return Ok(Value::Null);
        }
        match obj {
            Value::Map(record) => Ok(record.get(key).cloned().unwrap_or_default()),
            Value::Object(object) => object.attr(key).ok_or_else(|| self.data_error(obj, key)),
            _ => Err(self.data_error(obj, key)),
        }
    }

    fn data_error(&self, container: &Value, key: &str) -> MapperError {
        MapperError::Data {
            container: container.clone(),
            key: key.to_string(),
            mapper: self.def.name.clone(),
        }
    }

    fn place(
        &self,
        parsed: &mut Record,
        name: &str,
        field: &Field,
        value: Value,
    ) -> Result<(), MapperError> {
        if let Some(attach) = self.def.hooks.attach(name) {
            return attach(self, parsed, value);
        }
        if field.attach_parent() {
            return match value {
                Value::Map(record) => {
                    parsed.extend(record);
                    Ok(())
                }
                Value::Null => Ok(()),
                other => Err(MapperError::Type {
                    field: name.to_string(),
                    expected: "map",
                    found: other.kind(),
                }),
            };
        }
        let key = self.key_name(name, &value, field);
        parsed.insert(key, value);
        Ok(())
    }

    /// Result key for a declared name; the declared name unless a hook says otherwise.
    pub fn key_name(&self, name: &str, value: &Value, field: &Field) -> String {
        match self.def.hooks.key_name() {
            Some(key_name) => key_name(self, name, value, field),
            None => name.to_string(),
        }
    }

    /// Final ordering. By default keys follow the declared order, with keys that
    /// match no declared name kept in placement order ahead of the rest.
    pub fn order(&self, parsed: Record) -> Result<Record, MapperError> {
        match self.def.hooks.order() {
            Some(order) => order(self, parsed),
            None => Ok(sort_record_with_keys(parsed, self.def.meta.field_names())),
        }
    }
}

impl fmt::Debug for Mapper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("def", &self.def.name)
            .field("data", &self.data)
            .field("options", &self.options)
            .finish()
    }
}
