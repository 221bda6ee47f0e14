//! Field derivation from model descriptions.
//!
//! Scalar columns become raw fields, file columns resolve to their URL and
//! relation columns delegate to a mapping type derived for the related model.
//! Relations pointing back at a model already being derived are skipped, so
//! self references and reference cycles terminate.

use crate::error::SchemaError;
use crate::model::{Column, ColumnKind, Schema};
use fieldmap_core::{Convert, Delegate, Field, Mapper, MapperBuilder, MapperDef, MapperError, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Builds the field for a column of a given type.
pub type FieldFactory = Arc<dyn Fn(&Column) -> Field + Send + Sync>;

/// Column selection and per-type field overrides.
///
/// `include` and `exclude` apply to the requested model only. Overrides also
/// apply to every related model derived along the way.
#[derive(Clone, Default)]
pub struct DeriveOptions {
    include: Option<Vec<String>>,
    exclude: Vec<String>,
    overrides: BTreeMap<String, FieldFactory>,
}

impl DeriveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only these columns.
    pub fn include<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.include = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.exclude.extend(names.into_iter().map(Into::into));
        self
    }

    /// Replace the field built for columns tagged `type_key` (e.g. `"date_time"`).
    ///
    /// Relation columns always delegate and ignore overrides.
    pub fn override_type(
        mut self,
        type_key: impl Into<String>,
        factory: impl Fn(&Column) -> Field + Send + Sync + 'static,
    ) -> Self {
        self.overrides.insert(type_key.into(), Arc::new(factory));
        self
    }

    fn keeps(&self, column: &str) -> bool {
        let included = self
            .include
            .as_ref()
            .is_none_or(|names| names.iter().any(|name| name == column));
        included && !self.exclude.iter().any(|name| name == column)
    }

    /// Options for a related model: overrides only.
    fn for_related(&self) -> Self {
        Self {
            include: None,
            exclude: Vec::new(),
            overrides: self.overrides.clone(),
        }
    }
}

/// A file column: a present file renders as its `url` attribute, an empty one
/// as null.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileUrl;

impl Convert for FileUrl {
    fn name(&self) -> &str {
        "FileUrl"
    }

    fn as_value(&self, mapper: &Mapper<'_>, value: Value) -> Result<Value, MapperError> {
        if !value.is_truthy() {
            return Ok(Value::Null);
        }
        match value.get("url") {
            Some(url) if url.is_truthy() => Ok(url),
            Some(_) => Ok(Value::Null),
            None => Err(MapperError::Data {
                container: value,
                key: "url".to_string(),
                mapper: mapper.name().to_string(),
            }),
        }
    }

    fn is_nonkey(&self) -> Result<bool, MapperError> {
        Ok(false)
    }
}

/// Name given to the mapping type derived for `model`.
pub fn mapper_name(model: &str) -> String {
    format!("{model}Mapper")
}

/// Field declarations for the columns of `model`, in column order.
pub fn derive_fields(
    schema: &Schema,
    model: &str,
    options: &DeriveOptions,
) -> Result<Vec<(String, Field)>, SchemaError> {
    Deriver {
        schema,
        path: Vec::new(),
    }
    .fields(model, options)
}

/// A builder pre-loaded with the derived fields of `model`.
///
/// Fields declared on the returned builder are registered after the derived
/// ones and replace them by name.
pub fn model_mapper_builder(
    schema: &Schema,
    model: &str,
    options: &DeriveOptions,
) -> Result<MapperBuilder, SchemaError> {
    let fields = derive_fields(schema, model, options)?;
    Ok(MapperDef::builder(mapper_name(model)).fields(fields))
}

/// The mapping type derived for `model`.
pub fn model_mapper(
    schema: &Schema,
    model: &str,
    options: &DeriveOptions,
) -> Result<Arc<MapperDef>, SchemaError> {
    Ok(model_mapper_builder(schema, model, options)?.build())
}

struct Deriver<'a> {
    schema: &'a Schema,
    /// Models currently being derived, outermost first.
    path: Vec<String>,
}

impl Deriver<'_> {
    fn fields(
        &mut self,
        model: &str,
        options: &DeriveOptions,
    ) -> Result<Vec<(String, Field)>, SchemaError> {
        let description = self.schema.model(model)?;
        self.path.push(model.to_string());

        let mut fields = Vec::with_capacity(description.columns.len());
        let mut outcome = Ok(());
        for column in description
            .columns
            .iter()
            .filter(|column| options.keeps(&column.name))
        {
            match self.column_field(column, options) {
                Ok(Some(field)) => fields.push((column.name.clone(), field)),
                Ok(None) => {}
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }

        self.path.pop();
        outcome?;
        debug!(model, fields = fields.len(), "derived model fields");
        Ok(fields)
    }

    fn column_field(
        &mut self,
        column: &Column,
        options: &DeriveOptions,
    ) -> Result<Option<Field>, SchemaError> {
        let field = match &column.kind {
            ColumnKind::ForeignKey { to } | ColumnKind::OneToOne { to } => {
                let Some(target) = self.related(to, column, options)? else {
                    return Ok(None);
                };
                Field::delegate(Delegate::to(&target).required(!column.null))
            }
            ColumnKind::ManyToMany { to } => {
                let Some(target) = self.related(to, column, options)? else {
                    return Ok(None);
                };
                // The source value is a related-set manager; calling it yields the rows.
                Field::list_delegate(
                    Delegate::to(&target)
                        .required(!column.null)
                        .filter(Value::invoke),
                )
            }
            kind => match options.overrides.get(kind.type_key()) {
                Some(factory) => return Ok(Some(factory(column))),
                None if *kind == ColumnKind::File => Field::custom(FileUrl),
                None => Field::raw(),
            },
        };
        Ok(Some(field.key(column.name.as_str())))
    }

    fn related(
        &mut self,
        to: &str,
        column: &Column,
        options: &DeriveOptions,
    ) -> Result<Option<Arc<MapperDef>>, SchemaError> {
        if self.path.iter().any(|model| model == to) {
            debug!(
                column = %column.name,
                related = to,
                "skipping relation back to a model being derived"
            );
            return Ok(None);
        }
        let fields = self.fields(to, &options.for_related())?;
        Ok(Some(MapperDef::builder(mapper_name(to)).fields(fields).build()))
    }
}
