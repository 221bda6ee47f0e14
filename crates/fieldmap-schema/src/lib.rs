//! # Fieldmap Schema
//!
//! Derives mapping types from external model descriptions, so records for
//! ORM-style models need no hand-written field lists.
//!
//! ```text
//! schema.{json,toml}  →  Schema  →  derive_fields / model_mapper  →  MapperDef
//! ```
//!
//! ```
//! use fieldmap_core::record;
//! use fieldmap_schema::{DeriveOptions, Schema, model_mapper};
//!
//! let schema = Schema::from_json_str(r#"{"models": [
//!     {"name": "Person", "columns": [
//!         {"name": "id", "type": "auto"},
//!         {"name": "name", "type": "char"}
//!     ]}
//! ]}"#).unwrap();
//!
//! let person = model_mapper(&schema, "Person", &DeriveOptions::new()).unwrap();
//! let result = person.map(record! {"id" => 1, "name" => "Ann"}).unwrap();
//! assert_eq!(result, record! {"id" => 1, "name" => "Ann"});
//! ```

pub mod derive;
pub mod error;
pub mod model;

pub use derive::{
    DeriveOptions, FieldFactory, FileUrl, derive_fields, mapper_name, model_mapper,
    model_mapper_builder,
};
pub use error::SchemaError;
pub use model::{Column, ColumnKind, ModelDescription, Schema};
