//! Field descriptors.
//!
//! A field knows where its value lives in the source (its source key, unless
//! it is non-keyed) and how to turn the extracted value into the value placed
//! in the result:
//!
//! ```text
//! callback  →  as_value (per variant)  →  after_callback
//! ```
//!
//! Delegating variants hand the value to a nested mapping type and return its
//! resolved record (or a list of records).

use crate::error::MapperError;
use crate::mapper::{Mapper, MapperDef};
use crate::value::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A plain value-to-value transform used for field callbacks and delegate filters.
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Extension point for field variants defined outside this crate.
///
/// Both operations fail with [`MapperError::Unimplemented`] unless overridden.
pub trait Convert: Send + Sync {
    /// Variant name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Core conversion of the (callback-filtered) value.
    fn as_value(&self, mapper: &Mapper<'_>, value: Value) -> Result<Value, MapperError> {
        let _ = (mapper, value);
        Err(MapperError::Unimplemented {
            variant: self.name().to_string(),
            operation: "as_value",
        })
    }

    /// Whether the field reads nothing from the source.
    fn is_nonkey(&self) -> Result<bool, MapperError> {
        Err(MapperError::Unimplemented {
            variant: self.name().to_string(),
            operation: "is_nonkey",
        })
    }
}

/// Target and options of a delegating field.
#[derive(Clone)]
pub struct Delegate {
    target: Arc<MapperDef>,
    required: bool,
    attach_parent: bool,
    before_filter: Option<Transform>,
    filter: Option<Transform>,
    after_filter: Option<Transform>,
}

impl Delegate {
    /// Delegate to `target`. Required by default.
    pub fn to(target: &Arc<MapperDef>) -> Self {
        Self {
            target: Arc::clone(target),
            required: true,
            attach_parent: false,
            before_filter: None,
            filter: None,
            after_filter: None,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Merge the delegate's record into the parent result instead of nesting it.
    pub fn attach_parent(mut self, attach_parent: bool) -> Self {
        self.attach_parent = attach_parent;
        self
    }

    /// Applied to each value right before the required check.
    pub fn before_filter(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.before_filter = Some(Arc::new(f));
        self
    }

    /// List variants only: applied to the whole sequence first.
    pub fn filter(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(f));
        self
    }

    /// List variants only: applied to each resolved element.
    pub fn after_filter(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.after_filter = Some(Arc::new(f));
        self
    }

    pub fn target(&self) -> &Arc<MapperDef> {
        &self.target
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    fn resolve_one(
        &self,
        mapper: &Mapper<'_>,
        name: &str,
        value: Value,
    ) -> Result<Value, MapperError> {
        let value = apply(self.before_filter.as_ref(), value);
        if value.is_null() {
            if !self.required {
                return Ok(Value::Null);
            }
            return Err(MapperError::InvalidDelegate {
                field: name.to_string(),
                mapper: mapper.name().to_string(),
            });
        }
        mapper.delegate(&self.target, value).resolve().map(Value::Map)
    }
}

/// The conversion performed by a field.
#[derive(Clone)]
pub enum FieldKind {
    /// Never extracted; the value comes from a mapper hook.
    NonKey,
    /// Non-keyed constant.
    Stub(Value),
    /// Identity.
    Raw,
    /// Table lookup of raw value to display value.
    Choice(Vec<(Value, Value)>),
    Delegate(Delegate),
    ListDelegate(Delegate),
    NonKeyDelegate(Delegate),
    NonKeyListDelegate(Delegate),
    Custom(Arc<dyn Convert>),
}

impl FieldKind {
    fn label(&self) -> &str {
        match self {
            Self::NonKey => "NonKey",
            Self::Stub(_) => "Stub",
            Self::Raw => "Raw",
            Self::Choice(_) => "Choice",
            Self::Delegate(_) => "Delegate",
            Self::ListDelegate(_) => "ListDelegate",
            Self::NonKeyDelegate(_) => "NonKeyDelegate",
            Self::NonKeyListDelegate(_) => "NonKeyListDelegate",
            Self::Custom(convert) => convert.name(),
        }
    }
}

/// A declared field.
///
/// Built once when a mapping type is declared and shared read-only afterwards.
/// The source key, when omitted, is assigned from the declared name the first
/// time the field is registered.
#[derive(Clone)]
pub struct Field {
    key: OnceLock<String>,
    callback: Option<Transform>,
    after_callback: Option<Transform>,
    skip_callable: bool,
    kind: FieldKind,
}

impl Field {
    fn with_kind(kind: FieldKind) -> Self {
        let skip_callable = matches!(
            kind,
            FieldKind::Delegate(_)
                | FieldKind::ListDelegate(_)
                | FieldKind::NonKeyDelegate(_)
                | FieldKind::NonKeyListDelegate(_)
        );
        Self {
            key: OnceLock::new(),
            callback: None,
            after_callback: None,
            skip_callable,
            kind,
        }
    }

    pub fn non_key() -> Self {
        Self::with_kind(FieldKind::NonKey)
    }

    pub fn stub(value: impl Into<Value>) -> Self {
        Self::with_kind(FieldKind::Stub(value.into()))
    }

    pub fn raw() -> Self {
        Self::with_kind(FieldKind::Raw)
    }

    pub fn choice<R, D>(choices: impl IntoIterator<Item = (R, D)>) -> Self
    where
        R: Into<Value>,
        D: Into<Value>,
    {
        Self::with_kind(FieldKind::Choice(
            choices
                .into_iter()
                .map(|(raw, display)| (raw.into(), display.into()))
                .collect(),
        ))
    }

    pub fn delegate(delegate: Delegate) -> Self {
        Self::with_kind(FieldKind::Delegate(delegate))
    }

    pub fn list_delegate(delegate: Delegate) -> Self {
        Self::with_kind(FieldKind::ListDelegate(delegate))
    }

    pub fn non_key_delegate(delegate: Delegate) -> Self {
        Self::with_kind(FieldKind::NonKeyDelegate(delegate))
    }

    pub fn non_key_list_delegate(delegate: Delegate) -> Self {
        Self::with_kind(FieldKind::NonKeyListDelegate(delegate))
    }

    pub fn custom(convert: impl Convert + 'static) -> Self {
        Self::with_kind(FieldKind::Custom(Arc::new(convert)))
    }

    /// Source key or dotted path (`"author.name"`) to read from.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = OnceLock::from(key.into());
        self
    }

    /// Pre-conversion hook.
    pub fn callback(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.callback = Some(Arc::new(f));
        self
    }

    /// Post-conversion hook.
    pub fn after_callback(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.after_callback = Some(Arc::new(f));
        self
    }

    /// Whether a callable extracted value is passed on as-is instead of invoked.
    ///
    /// Defaults to `true` for delegates and `false` for everything else.
    pub fn skip_callable(mut self, skip: bool) -> Self {
        self.skip_callable = skip;
        self
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn source_key(&self) -> Option<&str> {
        self.key.get().map(String::as_str)
    }

    pub fn skips_callable(&self) -> bool {
        self.skip_callable
    }

    pub fn is_nonkey(&self) -> Result<bool, MapperError> {
        match &self.kind {
            FieldKind::NonKey
            | FieldKind::Stub(_)
            | FieldKind::NonKeyDelegate(_)
            | FieldKind::NonKeyListDelegate(_) => Ok(true),
            FieldKind::Raw
            | FieldKind::Choice(_)
            | FieldKind::Delegate(_)
            | FieldKind::ListDelegate(_) => Ok(false),
            FieldKind::Custom(convert) => convert.is_nonkey(),
        }
    }

    /// Whether the resolved record is merged into the parent result.
    pub fn attach_parent(&self) -> bool {
        match &self.kind {
            FieldKind::Delegate(delegate)
            | FieldKind::ListDelegate(delegate)
            | FieldKind::NonKeyDelegate(delegate)
            | FieldKind::NonKeyListDelegate(delegate) => delegate.attach_parent,
            _ => false,
        }
    }

    /// Set the source key unless one is already set. Returns whether it was set.
    pub(crate) fn assign_key(&self, name: &str) -> bool {
        self.key.set(name.to_string()).is_ok()
    }

    /// callback → as_value → after_callback.
    ///
    /// `name` is the declared name, used in error reports.
    pub fn resolve_value(
        &self,
        mapper: &Mapper<'_>,
        name: &str,
        value: Value,
    ) -> Result<Value, MapperError> {
        let value = apply(self.callback.as_ref(), value);
        let value = self.as_value(mapper, name, value)?;
        Ok(apply(self.after_callback.as_ref(), value))
    }

    pub fn as_value(
        &self,
        mapper: &Mapper<'_>,
        name: &str,
        value: Value,
    ) -> Result<Value, MapperError> {
        match &self.kind {
            FieldKind::NonKey | FieldKind::Raw => Ok(value),
            FieldKind::Stub(stub) => Ok(stub.clone()),
            FieldKind::Choice(choices) => choices
                .iter()
                .find(|(raw, _)| *raw == value)
                .map(|(_, display)| display.clone())
                .ok_or_else(|| MapperError::Lookup {
                    field: name.to_string(),
                    value,
                }),
            FieldKind::Delegate(delegate) | FieldKind::NonKeyDelegate(delegate) => {
                delegate.resolve_one(mapper, name, value)
            }
            FieldKind::ListDelegate(delegate) => self.as_list(delegate, mapper, name, value, true),
            FieldKind::NonKeyListDelegate(delegate) => {
                self.as_list(delegate, mapper, name, value, false)
            }
            FieldKind::Custom(convert) => convert.as_value(mapper, value),
        }
    }

    fn as_list(
        &self,
        delegate: &Delegate,
        mapper: &Mapper<'_>,
        name: &str,
        value: Value,
        keyed: bool,
    ) -> Result<Value, MapperError> {
        let items = match apply(delegate.filter.as_ref(), value) {
            Value::Null if !keyed => Vec::new(),
            Value::Null if !delegate.required => return Ok(Value::Null),
            Value::Null => {
                return Err(MapperError::InvalidDelegate {
                    field: name.to_string(),
                    mapper: mapper.name().to_string(),
                });
            }
            Value::List(items) => items,
            other => {
                return Err(MapperError::Type {
                    field: name.to_string(),
                    expected: "list",
                    found: other.kind(),
                });
            }
        };

        let mut parsed = Vec::with_capacity(items.len());
        for item in items {
            let item = apply(self.callback.as_ref(), item);
            // Non-keyed elements skip the required check: null maps like any other value.
            let resolved = if keyed {
                delegate.resolve_one(mapper, name, item)?
            } else {
                Value::Map(mapper.delegate(&delegate.target, item).resolve()?)
            };
            parsed.push(apply(delegate.after_filter.as_ref(), resolved));
        }
        Ok(Value::List(parsed))
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("kind", &self.kind.label())
            .field("key", &self.source_key())
            .finish()
    }
}

fn apply(transform: Option<&Transform>, value: Value) -> Value {
    match transform {
        Some(f) => f(value),
        None => value,
    }
}
