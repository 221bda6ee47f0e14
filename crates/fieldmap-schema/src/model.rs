//! External model descriptions.
//!
//! A schema file lists models and their columns. Column types mirror what an
//! ORM exposes: scalar columns, file columns and the three relation kinds.
//!
//! ```toml
//! [[models]]
//! name = "Book"
//! columns = [
//!     { name = "id", type = "auto" },
//!     { name = "title", type = "char" },
//!     { name = "author", type = "foreign_key", to = "Person", null = true },
//! ]
//! ```

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Column type of a model description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnKind {
    Auto,
    Char,
    Text,
    Integer,
    DateTime,
    Date,
    Time,
    Boolean,
    File,
    ForeignKey { to: String },
    OneToOne { to: String },
    ManyToMany { to: String },
    #[serde(other)]
    Other,
}

impl ColumnKind {
    /// Tag used in schema files and as the override key in derivation.
    pub fn type_key(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Char => "char",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::DateTime => "date_time",
            Self::Date => "date",
            Self::Time => "time",
            Self::Boolean => "boolean",
            Self::File => "file",
            Self::ForeignKey { .. } => "foreign_key",
            Self::OneToOne { .. } => "one_to_one",
            Self::ManyToMany { .. } => "many_to_many",
            Self::Other => "other",
        }
    }

    /// Target model of a relation column.
    pub fn related_model(&self) -> Option<&str> {
        match self {
            Self::ForeignKey { to } | Self::OneToOne { to } | Self::ManyToMany { to } => Some(to),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(flatten)]
    pub kind: ColumnKind,
    /// Whether the column may be empty.
    #[serde(default)]
    pub null: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            null: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.null = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescription {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl ModelDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    models: Vec<ModelDescription>,
}

/// Catalog of model descriptions, indexed by model name.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    models: BTreeMap<String, ModelDescription>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog; model names must be unique.
    pub fn from_models(
        models: impl IntoIterator<Item = ModelDescription>,
    ) -> Result<Self, SchemaError> {
        let mut schema = Self::new();
        for model in models {
            schema.insert(model)?;
        }
        Ok(schema)
    }

    pub fn insert(&mut self, model: ModelDescription) -> Result<(), SchemaError> {
        if self.models.contains_key(&model.name) {
            return Err(SchemaError::DuplicateModel(model.name));
        }
        self.models.insert(model.name.clone(), model);
        Ok(())
    }

    pub fn from_json_str(text: &str) -> Result<Self, SchemaError> {
        parse_json(text, "<inline>")
    }

    pub fn from_toml_str(text: &str) -> Result<Self, SchemaError> {
        parse_toml(text, "<inline>")
    }

    /// Load a schema file; the format follows the extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let extension = path.extension().and_then(|ext| ext.to_str());
        if !matches!(extension, Some("json" | "toml")) {
            return Err(SchemaError::UnsupportedFormat { path: label });
        }

        let text = fs::read_to_string(path).map_err(|error| SchemaError::Io {
            path: label.clone(),
            message: error.to_string(),
        })?;
        match extension {
            Some("toml") => parse_toml(&text, &label),
            _ => parse_json(&text, &label),
        }
    }

    pub fn model(&self, name: &str) -> Result<&ModelDescription, SchemaError> {
        self.models
            .get(name)
            .ok_or_else(|| SchemaError::UnknownModel(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Models in name order.
    pub fn models(&self) -> impl Iterator<Item = &ModelDescription> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

fn parse_json(text: &str, label: &str) -> Result<Schema, SchemaError> {
    let file: SchemaFile =
        serde_json::from_str(text).map_err(|error| SchemaError::InvalidJson {
            path: label.to_string(),
            message: error.to_string(),
        })?;
    Schema::from_models(file.models)
}

fn parse_toml(text: &str, label: &str) -> Result<Schema, SchemaError> {
    let file: SchemaFile = toml::from_str(text).map_err(|error| SchemaError::InvalidToml {
        path: label.to_string(),
        message: error.to_string(),
    })?;
    Schema::from_models(file.models)
}
