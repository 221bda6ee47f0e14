//! # Fieldmap Core
//!
//! Declarative object-to-record mapping: a mapping type declares named
//! fields, each reading a source key (or nothing at all) and converting the
//! value; resolving a source against it yields an insertion-ordered record
//! ready for any serde encoder.
//!
//! ## Architecture
//!
//! ```text
//! Value / Record        ← Dynamic source and result values
//!     │
//! Field                 ← Raw, Stub, Choice, Delegate, ... (+ Convert)
//!     │
//! Meta                  ← Override-aware registry, bucketed by source key
//!     │
//! MapperBuilder         ← Folds ancestors, registers own fields and hooks
//!     │
//! Mapper::resolve       ← extract → filter → convert → attach → order
//! ```
//!
//! ```
//! use fieldmap_core::{Field, MapperDef, record};
//!
//! let person = MapperDef::builder("Person")
//!     .field("nick", Field::raw().key("name"))
//!     .field("years", Field::raw().key("age"))
//!     .build();
//!
//! let result = person.map(record! {"name" => "Ann", "age" => 30}).unwrap();
//! assert_eq!(result, record! {"nick" => "Ann", "years" => 30});
//! ```

pub mod error;
pub mod field;
pub mod hooks;
pub mod mapper;
pub mod meta;
pub mod order;
pub mod value;

pub use error::MapperError;
pub use field::{Convert, Delegate, Field, FieldKind, Transform};
pub use hooks::{AttachFn, FieldFilter, FilterFn, Hooks, KeyNameFn, OrderFn, SupplyFn};
pub use mapper::{Config, Mapper, MapperBuilder, MapperDef};
pub use meta::{Entry, Meta};
pub use order::sort_record_with_keys;
pub use value::{Attrs, Callable, Object, Record, Value};
