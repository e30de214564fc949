//! Mutation execution: sequential ordering, post-mutation return selections
//! and authorization at the side-effect boundary.

mod common;

use common::{demo_context, demo_engine, run, run_as};
use pretty_assertions::assert_eq;
use serde_json::json;

use prism_engine::ErrorKind;

#[tokio::test]
async fn mutation_return_selection_projects_the_new_entity() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        r#"mutation { addPerson(name: "Han") { id name } }"#,
    )
    .await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        response.data_json(),
        json!({ "addPerson": { "id": 102, "name": "Han" } })
    );
}

#[tokio::test]
async fn mutations_run_sequentially_in_document_order() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        r#"mutation {
            a: addPerson(name: "Han") { id }
            b: addPerson(name: "Chewie") { id }
            total: removePeople
        }"#,
    )
    .await;
    // Each selection sees the context as left by the previous mutation.
    assert_eq!(
        response.data_json(),
        json!({ "a": { "id": 102 }, "b": { "id": 103 }, "total": 3 })
    );
}

#[tokio::test]
async fn mutations_mutate_the_shared_context() {
    let engine = demo_engine();
    let mut context = demo_context();
    run(
        &engine,
        &mut context,
        r#"mutation { addPerson(name: "Han") { id } }"#,
    )
    .await;
    let response = run(&engine, &mut context, "{ totalPeople }").await;
    assert_eq!(response.data_json(), json!({ "totalPeople": 2 }));
}

#[tokio::test]
async fn value_outcomes_are_used_directly() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(&engine, &mut context, "mutation { removePeople }").await;
    assert_eq!(response.data_json(), json!({ "removePeople": 1 }));
}

#[tokio::test]
async fn mutations_authorize_before_the_side_effect() {
    let engine = demo_engine();
    let mut context = demo_context();

    let denied = run(&engine, &mut context, "mutation { adminOnly }").await;
    assert_eq!(denied.data_json(), json!({ "adminOnly": null }));
    assert!(denied.errors[0].is(ErrorKind::Unauthorized));

    let allowed = run_as(&engine, &mut context, "mutation { adminOnly }", &["admin"]).await;
    assert_eq!(allowed.data_json(), json!({ "adminOnly": 1 }));
}

#[tokio::test]
async fn schemas_without_a_mutation_root_reject_mutations() {
    let host = common::demo_host();
    let engine = prism_engine::Engine::new(
        prism_engine::registry::Registry::reflect(&host, "DemoContext").unwrap(),
    );
    let mut context = demo_context();
    let response = run(&engine, &mut context, "mutation { anything }").await;
    assert!(response.data.is_none());
    assert!(response.errors[0].is(ErrorKind::CompilerError));
    assert!(response.errors[0]
        .message
        .contains("not configured for mutations"));
}
