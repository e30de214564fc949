//! The error taxonomy: abort-vs-isolate propagation, schema edits,
//! authorization and the testable kind prefixes.

mod common;

use common::{demo_context, demo_engine, run, run_as};
use pretty_assertions::assert_eq;
use serde_json::json;

use prism_engine::ErrorKind;

#[tokio::test]
async fn removed_fields_fail_compilation_with_no_data() {
    let mut engine = demo_engine();
    engine.registry_mut().remove_field("Person", "id").unwrap();

    let mut context = demo_context();
    let response = run(&engine, &mut context, "{ people { id } }").await;
    assert!(response.data.is_none());
    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].is(ErrorKind::CompilerError));
    assert!(response.errors[0]
        .message
        .contains("Field 'id' not found on type 'Person'"));
}

#[tokio::test]
async fn unknown_arguments_abort_compilation() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(&engine, &mut context, "{ totalPeople(x: 1) }").await;
    assert!(response.data.is_none());
    assert!(response.errors[0].is(ErrorKind::CompilerError));
    assert!(response.errors[0]
        .message
        .contains("Argument 'x' not found on field 'totalPeople'"));
}

#[tokio::test]
async fn missing_required_arguments_fail_only_their_field() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(&engine, &mut context, "{ totalPeople person { name } }").await;
    assert_eq!(
        response.data_json(),
        json!({ "totalPeople": 1, "person": null })
    );
    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].is(ErrorKind::InvalidArgument));
    assert_eq!(response.errors[0].path.len(), 1);
}

#[tokio::test]
async fn argument_type_mismatches_fail_only_their_field() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        r#"{ totalPeople person(id: "nope") { name } }"#,
    )
    .await;
    assert_eq!(
        response.data_json(),
        json!({ "totalPeople": 1, "person": null })
    );
    assert!(response.errors[0].is(ErrorKind::InvalidArgument));
}

#[tokio::test]
async fn missing_variables_abort_the_request() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        "query ($id: Int!) { person(id: $id) { name } }",
    )
    .await;
    assert!(response.data.is_none());
    assert!(response.errors[0].is(ErrorKind::InvalidArgument));
    assert!(response.errors[0].message.contains("$id"));
}

#[tokio::test]
async fn unauthorized_fields_null_out_without_leaking_the_rule() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(&engine, &mut context, "{ totalPeople secret }").await;
    assert_eq!(
        response.data_json(),
        json!({ "totalPeople": 1, "secret": null })
    );
    assert_eq!(response.errors.len(), 1);
    let error = &response.errors[0];
    assert!(error.is(ErrorKind::Unauthorized));
    assert!(error.message.contains("secret"));
    // The denied role never surfaces.
    assert!(!error.message.contains("admin"));
}

#[tokio::test]
async fn authorized_principals_read_protected_fields() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run_as(&engine, &mut context, "{ secret }", &["admin"]).await;
    assert_eq!(response.data_json(), json!({ "secret": "plans" }));
}

#[tokio::test]
async fn type_level_requirements_guard_every_selection_of_the_type() {
    let engine = demo_engine();
    let mut context = demo_context();

    let denied = run(&engine, &mut context, "{ payroll { total } }").await;
    assert_eq!(denied.data_json(), json!({ "payroll": null }));
    assert!(denied.errors[0].is(ErrorKind::Unauthorized));

    let allowed = run_as(&engine, &mut context, "{ payroll { total } }", &["hr"]).await;
    assert_eq!(allowed.data_json(), json!({ "payroll": { "total": 1000000 } }));
}

#[tokio::test]
async fn adding_a_requirement_only_narrows_access() {
    let mut engine = demo_engine();
    let mut context = demo_context();

    let before = run(&engine, &mut context, "{ totalPeople }").await;
    assert!(before.is_ok());

    let mut field = engine
        .registry()
        .get_field("Query", "totalPeople")
        .unwrap()
        .clone();
    field = field.with_required_role("auditor");
    engine.registry_mut().replace_field("Query", field).unwrap();

    let after = run(&engine, &mut context, "{ totalPeople }").await;
    assert_eq!(after.data_json(), json!({ "totalPeople": null }));
    assert!(after.errors[0].is(ErrorKind::Unauthorized));

    let with_role = run_as(&engine, &mut context, "{ totalPeople }", &["auditor"]).await;
    assert!(with_role.is_ok());
}

#[tokio::test]
async fn execution_errors_carry_paths_and_spare_peers() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        "mutation { failingMutation removePeople }",
    )
    .await;
    assert_eq!(
        response.data_json(),
        json!({ "failingMutation": null, "removePeople": 1 })
    );
    assert_eq!(response.errors.len(), 1);
    let error = &response.errors[0];
    assert!(error.is(ErrorKind::ExecutionError));
    assert!(error.message.contains("the database is on fire"));
    assert_eq!(
        serde_json::to_value(&error.path).unwrap(),
        json!(["failingMutation"])
    );
}

#[tokio::test]
async fn parse_errors_abort_with_the_parse_kind() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(&engine, &mut context, "{ people { ").await;
    assert!(response.data.is_none());
    assert!(response.errors[0].is(ErrorKind::ParseError));
}

#[tokio::test]
async fn leaf_fields_reject_sub_selections() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(&engine, &mut context, "{ totalPeople { x } }").await;
    assert!(response.data.is_none());
    assert!(response.errors[0].is(ErrorKind::CompilerError));
}

#[tokio::test]
async fn composite_fields_require_sub_selections() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(&engine, &mut context, "{ people }").await;
    assert!(response.data.is_none());
    assert!(response.errors[0].is(ErrorKind::CompilerError));
}
