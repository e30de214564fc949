//! End-to-end query execution: selection shaping, aliases, arguments,
//! variables, directives and cancellation.

mod common;

use common::{demo_context, demo_engine, people_context, run};
use pretty_assertions::assert_eq;
use prism_engine::{CancellationToken, ErrorKind, Request, Variables};
use serde_json::json;

#[tokio::test]
async fn projects_exactly_the_selected_fields() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(&engine, &mut context, "{ people { id name } }").await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        response.data_json(),
        json!({ "people": [{ "id": 99, "name": "Luke" }] })
    );
}

#[tokio::test]
async fn expression_fields_compose_over_the_context() {
    let engine = demo_engine();
    let mut context = people_context(15);
    let response = run(&engine, &mut context, "{ totalPeople }").await;
    assert_eq!(response.data_json(), json!({ "totalPeople": 15 }));
}

#[tokio::test]
async fn nested_collections_project_through() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(&engine, &mut context, "{ projects { tasks { id name } } }").await;
    assert!(response.is_ok(), "{:?}", response.errors);
    let data = response.data_json();
    let tasks = data["projects"][0]["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 4);
    for task in tasks {
        let keys: Vec<&str> = task.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["id", "name"]);
    }
}

#[tokio::test]
async fn aliases_rename_output_keys() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        "{ count: totalPeople crew: people { n: name } }",
    )
    .await;
    assert_eq!(
        response.data_json(),
        json!({ "count": 1, "crew": [{ "n": "Luke" }] })
    );
}

#[tokio::test]
async fn argument_driven_expression_field() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(&engine, &mut context, r#"{ person(id: 99) { name } }"#).await;
    assert_eq!(response.data_json(), json!({ "person": { "name": "Luke" } }));

    let response = run(&engine, &mut context, r#"{ person(id: 1) { name } }"#).await;
    assert_eq!(response.data_json(), json!({ "person": null }));
}

#[tokio::test]
async fn variables_substitute_into_arguments() {
    let engine = demo_engine();
    let mut context = demo_context();
    let variables: Variables = serde_json::from_value(json!({ "id": 99 })).unwrap();
    let request = Request::new("query ($id: Int!) { person(id: $id) { name } }")
        .variables(variables);
    let response = engine.execute(&mut context, request).await;
    assert_eq!(response.data_json(), json!({ "person": { "name": "Luke" } }));
}

#[tokio::test]
async fn variable_defaults_apply_when_absent() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        "query ($id: Int = 99) { person(id: $id) { id } }",
    )
    .await;
    assert_eq!(response.data_json(), json!({ "person": { "id": 99 } }));
}

#[tokio::test]
async fn skip_and_include_drop_selections_during_binding() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        "{ people { id name @skip(if: true) lastName @include(if: false) } }",
    )
    .await;
    assert_eq!(response.data_json(), json!({ "people": [{ "id": 99 }] }));
}

#[tokio::test]
async fn nullable_objects_are_null_guarded() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        "{ people { manager { name } } projects { owner { name } } }",
    )
    .await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        response.data_json(),
        json!({
            "people": [{ "manager": null }],
            "projects": [
                { "owner": { "name": "Luke" } },
                { "owner": null },
            ],
        })
    );
}

#[tokio::test]
async fn enum_values_expose_schema_spelling() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(&engine, &mut context, "{ people { mood } }").await;
    assert_eq!(
        response.data_json(),
        json!({ "people": [{ "mood": "VERY_HAPPY" }] })
    );
}

#[tokio::test]
async fn typename_resolves_at_every_level() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        "{ __typename people { __typename id } }",
    )
    .await;
    assert_eq!(
        response.data_json(),
        json!({
            "__typename": "Query",
            "people": [{ "__typename": "Person", "id": 99 }],
        })
    );
}

#[tokio::test]
async fn named_operations_are_selected_by_name() {
    let engine = demo_engine();
    let mut context = demo_context();
    let request = Request::new("query A { totalPeople } query B { people { id } }")
        .with_operation_name("B");
    let response = engine.execute(&mut context, request).await;
    assert_eq!(response.data_json(), json!({ "people": [{ "id": 99 }] }));
}

#[tokio::test]
async fn compiling_twice_yields_identical_results() {
    let engine = demo_engine();
    let mut context = demo_context();
    let query = "{ people { id name } totalPeople }";
    let first = run(&engine, &mut context, query).await.data_json();
    // The second run is served from the plan cache.
    let second = run(&engine, &mut context, query).await.data_json();
    assert_eq!(first, second);
}

#[tokio::test]
async fn cancellation_aborts_the_whole_response() {
    let engine = demo_engine();
    let mut context = demo_context();
    let token = CancellationToken::new();
    token.cancel();
    let request = Request::new("{ totalPeople }").with_cancellation(token);
    let response = engine.execute(&mut context, request).await;
    assert!(response.data.is_none());
    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].is(ErrorKind::Cancelled));
}
