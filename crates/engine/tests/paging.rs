//! Connection (cursor) and offset paging: accounting invariants, cursor
//! round-trips, argument validation and page-size caps.

mod common;

use common::{demo_context, demo_engine, people_context, run};
use pretty_assertions::assert_eq;
use serde_json::json;

use prism_engine::ErrorKind;

#[tokio::test]
async fn connection_accounting_over_five_actors() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        "{ actors(first: 2) { totalCount edges { cursor node { id } } pageInfo { hasNextPage } } }",
    )
    .await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        response.data_json(),
        json!({
            "actors": {
                "totalCount": 5,
                "edges": [
                    { "cursor": "MA==", "node": { "id": 1 } },
                    { "cursor": "MQ==", "node": { "id": 2 } },
                ],
                "pageInfo": { "hasNextPage": true },
            }
        })
    );
}

#[tokio::test]
async fn after_cursor_continues_the_window() {
    let engine = demo_engine();
    let mut context = demo_context();
    let first_page = run(
        &engine,
        &mut context,
        "{ actors(first: 2) { pageInfo { endCursor } } }",
    )
    .await
    .data_json();
    let end_cursor = first_page["actors"]["pageInfo"]["endCursor"]
        .as_str()
        .unwrap()
        .to_owned();

    let query = format!(
        r#"{{ actors(first: 2, after: "{end_cursor}") {{ edges {{ node {{ id }} }} pageInfo {{ hasNextPage hasPreviousPage }} }} }}"#
    );
    let response = run(&engine, &mut context, &query).await;
    assert_eq!(
        response.data_json(),
        json!({
            "actors": {
                "edges": [
                    { "node": { "id": 3 } },
                    { "node": { "id": 4 } },
                ],
                "pageInfo": { "hasNextPage": true, "hasPreviousPage": true },
            }
        })
    );
}

#[tokio::test]
async fn last_without_cursor_takes_the_tail() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        "{ actors(last: 2) { edges { node { id } } pageInfo { hasNextPage hasPreviousPage } } }",
    )
    .await;
    assert_eq!(
        response.data_json(),
        json!({
            "actors": {
                "edges": [
                    { "node": { "id": 4 } },
                    { "node": { "id": 5 } },
                ],
                "pageInfo": { "hasNextPage": false, "hasPreviousPage": true },
            }
        })
    );
}

#[tokio::test]
async fn before_cursor_with_last_cuts_backwards() {
    let engine = demo_engine();
    let mut context = demo_context();
    // base64("3"): the window ends before the fourth actor.
    let response = run(
        &engine,
        &mut context,
        r#"{ actors(last: 2, before: "Mw==") { edges { node { id } } } }"#,
    )
    .await;
    assert_eq!(
        response.data_json(),
        json!({ "actors": { "edges": [ { "node": { "id": 2 } }, { "node": { "id": 3 } } ] } })
    );
}

#[tokio::test]
async fn default_page_size_applies_when_no_bounds_given() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        "{ actors { edges { node { id } } pageInfo { hasNextPage } } }",
    )
    .await;
    let data = response.data_json();
    assert_eq!(data["actors"]["edges"].as_array().unwrap().len(), 5);
    assert_eq!(data["actors"]["pageInfo"]["hasNextPage"], json!(false));
}

#[tokio::test]
async fn total_count_alone_is_answerable() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(&engine, &mut context, "{ actors(first: 2) { totalCount } }").await;
    assert_eq!(response.data_json(), json!({ "actors": { "totalCount": 5 } }));
}

#[tokio::test]
async fn page_size_cap_rejects_oversized_windows() {
    let mut engine = demo_engine();
    engine.registry_mut().pagination.max_page_size = 3;
    let mut context = demo_context();

    for query in [
        "{ actors(first: 10) { totalCount } }",
        "{ actors(last: 10) { totalCount } }",
    ] {
        let response = run(&engine, &mut context, query).await;
        assert_eq!(response.data_json(), json!({ "actors": null }));
        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].is(ErrorKind::InvalidArgument));
    }
}

#[tokio::test]
async fn negative_page_sizes_are_rejected() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(&engine, &mut context, "{ actors(first: -1) { totalCount } }").await;
    assert!(response.errors[0].is(ErrorKind::InvalidArgument));
}

#[tokio::test]
async fn before_and_after_are_mutually_exclusive() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        r#"{ actors(after: "MA==", before: "Mw==") { totalCount } }"#,
    )
    .await;
    assert_eq!(response.data_json(), json!({ "actors": null }));
    assert!(response.errors[0].is(ErrorKind::InvalidArgument));
}

#[tokio::test]
async fn malformed_cursors_fail_only_their_field() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        r#"{ totalPeople actors(after: "???") { totalCount } }"#,
    )
    .await;
    assert_eq!(
        response.data_json(),
        json!({ "totalPeople": 1, "actors": null })
    );
    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].is(ErrorKind::InvalidCursor));
}

#[tokio::test]
async fn offset_paging_wraps_the_window_in_a_page_record() {
    let engine = demo_engine();
    let mut context = people_context(15);
    let response = run(
        &engine,
        &mut context,
        "{ peoplePaged(skip: 5, take: 5) { items { id } hasPreviousPage hasNextPage totalItems } }",
    )
    .await;
    assert!(response.is_ok(), "{:?}", response.errors);
    let data = response.data_json();
    let ids: Vec<i64> = data["peoplePaged"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, [6, 7, 8, 9, 10]);
    assert_eq!(data["peoplePaged"]["hasPreviousPage"], json!(true));
    assert_eq!(data["peoplePaged"]["hasNextPage"], json!(true));
    assert_eq!(data["peoplePaged"]["totalItems"], json!(15));
}

#[tokio::test]
async fn offset_paging_final_page_has_no_next() {
    let engine = demo_engine();
    let mut context = people_context(7);
    let response = run(
        &engine,
        &mut context,
        "{ peoplePaged(skip: 5, take: 5) { items { id } hasNextPage totalItems } }",
    )
    .await;
    let data = response.data_json();
    assert_eq!(data["peoplePaged"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(data["peoplePaged"]["hasNextPage"], json!(false));
}

#[tokio::test]
async fn start_and_end_cursors_frame_the_window() {
    let engine = demo_engine();
    let mut context = demo_context();
    let response = run(
        &engine,
        &mut context,
        "{ actors(first: 2) { pageInfo { startCursor endCursor } } }",
    )
    .await;
    assert_eq!(
        response.data_json(),
        json!({
            "actors": {
                "pageInfo": { "startCursor": "MA==", "endCursor": "MQ==" }
            }
        })
    );
}

#[tokio::test]
async fn window_past_the_end_is_empty() {
    let engine = demo_engine();
    let mut context = demo_context();
    // base64("9"): beyond the five actors.
    let response = run(
        &engine,
        &mut context,
        r#"{ actors(first: 2, after: "OQ==") { totalCount edges { cursor } pageInfo { hasNextPage startCursor } } }"#,
    )
    .await;
    assert_eq!(
        response.data_json(),
        json!({
            "actors": {
                "totalCount": 5,
                "edges": [],
                "pageInfo": { "hasNextPage": false, "startCursor": null },
            }
        })
    );
}
