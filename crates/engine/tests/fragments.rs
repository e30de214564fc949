//! Fragment resolution: spreads, inline fragments, nesting, merging and the
//! equivalence between fragment and inlined forms.

mod common;

use common::{demo_context, demo_engine, run};
use pretty_assertions::assert_eq;
use serde_json::json;

use prism_engine::ErrorKind;

#[tokio::test]
async fn fragment_and_inlined_forms_are_equivalent() {
    let engine = demo_engine();
    let mut context = demo_context();

    let with_fragment = run(
        &engine,
        &mut context,
        r#"
        { people { ...personBits manager { ...personBits } } }
        fragment personBits on Person { id name }
        "#,
    )
    .await;
    let inlined = run(
        &engine,
        &mut context,
        "{ people { id name manager { id name } } }",
    )
    .await;

    assert!(with_fragment.is_ok(), "{:?}", with_fragment.errors);
    assert_eq!(with_fragment.data_json(), inlined.data_json());
}

#[tokio::test]
async fn fragments_nest_transitively() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        r#"
        { projects { ...projectBits } }
        fragment projectBits on Project { id ...projectName tasks { ...taskBits } }
        fragment projectName on Project { name }
        fragment taskBits on Task { id name }
        "#,
    )
    .await;
    assert!(response.is_ok(), "{:?}", response.errors);
    let data = response.data_json();
    assert_eq!(data["projects"][0]["name"], json!("Deathstar"));
    assert_eq!(data["projects"][0]["tasks"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn inline_fragments_merge_into_the_parent_selection() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        "{ people { id ... on Person { name } } }",
    )
    .await;
    assert_eq!(
        response.data_json(),
        json!({ "people": [{ "id": 99, "name": "Luke" }] })
    );
}

#[tokio::test]
async fn duplicate_selections_of_the_same_field_merge() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        "{ people { id } people { name } }",
    )
    .await;
    assert_eq!(
        response.data_json(),
        json!({ "people": [{ "id": 99, "name": "Luke" }] })
    );
}

#[tokio::test]
async fn conflicting_output_names_are_rejected() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        "{ x: totalPeople x: people { id } }",
    )
    .await;
    assert!(response.data.is_none());
    assert!(response.errors[0].is(ErrorKind::CompilerError));

    let response = run(
        &engine,
        &mut context,
        "{ person(id: 1) { name } person(id: 2) { name } }",
    )
    .await;
    assert!(response.data.is_none());
    assert!(response.errors[0].is(ErrorKind::CompilerError));
}

#[tokio::test]
async fn fragment_cycles_are_rejected() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        r#"
        { people { ...a } }
        fragment a on Person { ...b }
        fragment b on Person { ...a }
        "#,
    )
    .await;
    assert!(response.data.is_none());
    assert!(response.errors[0].is(ErrorKind::CompilerError));
    assert!(response.errors[0].message.contains("cycle"));
}

#[tokio::test]
async fn unknown_fragments_are_rejected() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(&engine, &mut context, "{ people { ...missing } }").await;
    assert!(response.data.is_none());
    assert!(response.errors[0].is(ErrorKind::CompilerError));
}

#[tokio::test]
async fn disjoint_type_conditions_are_rejected() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        "{ people { ... on Project { id } } }",
    )
    .await;
    assert!(response.data.is_none());
    assert!(response.errors[0].is(ErrorKind::CompilerError));
}

#[tokio::test]
async fn fragments_apply_through_directives() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        r#"
        { people { id ...extra @skip(if: true) } }
        fragment extra on Person { name }
        "#,
    )
    .await;
    assert_eq!(response.data_json(), json!({ "people": [{ "id": 99 }] }));
}
