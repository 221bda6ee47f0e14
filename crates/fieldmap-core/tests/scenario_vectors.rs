//! Integration tests: run the mapping scenarios in tests/fixtures/.
//!
//! Each fixture directory has:
//! - source.json: the source value handed to the mapper
//! - expect.json: the expected result, in expected key order
//!
//! The mapping type for a fixture is declared in `mapper_for`. Results are
//! compared as serialized text so key order is part of the comparison.

use fieldmap_core::{Delegate, Field, MapperDef, Value};
use serde_json::Value as Json;
use std::path::PathBuf;
use std::sync::Arc;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn mapper_for(name: &str) -> Arc<MapperDef> {
    match name {
        "rename_fields" => MapperDef::builder("PersonMapper")
            .field("nick", Field::raw().key("name"))
            .field("years", Field::raw().key("age"))
            .build(),
        "optional_delegate_null" => {
            let person = MapperDef::builder("PersonMapper")
                .field("name", Field::raw())
                .build();
            MapperDef::builder("BookMapper")
                .field("title", Field::raw())
                .field(
                    "author",
                    Field::delegate(Delegate::to(&person).required(false)),
                )
                .build()
        }
        "inherited_override" => {
            let base = MapperDef::builder("M")
                .field("foo", Field::raw().key("x"))
                .build();
            MapperDef::builder("M2")
                .extends(&base)
                .field("foo", Field::raw().key("y"))
                .build()
        }
        "list_delegate_filter" => {
            let item = MapperDef::builder("ItemMapper")
                .field("v", Field::raw())
                .build();
            MapperDef::builder("ListMapper")
                .field(
                    "items",
                    Field::list_delegate(Delegate::to(&item).filter(|items| match items {
                        Value::List(items) => Value::List(
                            items
                                .into_iter()
                                .filter(|item| {
                                    item.get("v").and_then(|v| v.as_i64()).unwrap_or(0) > 10
                                })
                                .collect(),
                        ),
                        other => other,
                    })),
                )
                .build()
        }
        "flatten_delegate" => {
            let label = MapperDef::builder("LabelMapper")
                .field("label", Field::raw().key("name"))
                .build();
            MapperDef::builder("ParentMapper")
                .field(
                    "author",
                    Field::delegate(Delegate::to(&label).attach_parent(true)),
                )
                .build()
        }
        "dotted_path" => MapperDef::builder("DeepMapper")
            .field("value", Field::raw().key("a.b.c"))
            .build(),
        "shared_source_key" => MapperDef::builder("RoleMapper")
            .field(
                "upper",
                Field::raw()
                    .key("name")
                    .after_callback(|v| Value::from(v.as_str().unwrap_or_default().to_uppercase())),
            )
            .field("name", Field::raw())
            .field("role", Field::choice([(1, "viewer"), (2, "editor")]))
            .field("kind", Field::stub("person"))
            .build(),
        other => panic!("no mapper declared for fixture {other}"),
    }
}

fn run_fixture(name: &str) {
    let dir = fixtures_dir().join(name);

    let source_path = dir.join("source.json");
    let expect_path = dir.join("expect.json");

    let source_str = std::fs::read_to_string(&source_path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", source_path.display()));
    let expect_str = std::fs::read_to_string(&expect_path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", expect_path.display()));

    let source: Json = serde_json::from_str(&source_str)
        .unwrap_or_else(|e| panic!("failed to parse {}: {e}", source_path.display()));
    let expected: Json = serde_json::from_str(&expect_str)
        .unwrap_or_else(|e| panic!("failed to parse {}: {e}", expect_path.display()));

    let mapper = mapper_for(name);
    let result = mapper
        .map(Value::from(source))
        .unwrap_or_else(|e| panic!("fixture {name} failed to resolve: {e}"));

    let got = serde_json::to_string_pretty(&result).expect("failed to serialize result");
    let want = serde_json::to_string_pretty(&expected).expect("failed to serialize expected");
    assert_eq!(
        got, want,
        "\n\nFixture: {name}\n\nGot:\n{got}\n\nExpected:\n{want}\n"
    );
}

#[test]
fn rename_fields() {
    run_fixture("rename_fields");
}

#[test]
fn optional_delegate_null() {
    run_fixture("optional_delegate_null");
}

#[test]
fn inherited_override() {
    run_fixture("inherited_override");
}

#[test]
fn list_delegate_filter() {
    run_fixture("list_delegate_filter");
}

#[test]
fn flatten_delegate() {
    run_fixture("flatten_delegate");
}

#[test]
fn dotted_path() {
    run_fixture("dotted_path");
}

#[test]
fn shared_source_key() {
    run_fixture("shared_source_key");
}
