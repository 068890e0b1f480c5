//! # OpenAPI Sanity Tests
//!
//! Fetches the served document and checks it is internally coherent:
//! stable across fetches, closed under its schema references, and in
//! agreement with the wire names the handlers actually speak.

use std::collections::BTreeSet;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use hubnet_api::state::AppState;

/// Fetch /openapi.json from a fresh app with auth disabled.
async fn fetch_doc() -> Value {
    let app = hubnet_api::app(AppState::new());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect every `$ref` string reachable from `value`.
fn collect_refs(value: &Value, refs: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == "$ref" {
                    if let Some(target) = child.as_str() {
                        refs.push(target.to_string());
                    }
                } else {
                    collect_refs(child, refs);
                }
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_refs(child, refs);
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// 1. The document is identical across fresh instances
// ---------------------------------------------------------------------------

#[tokio::test]
async fn openapi_document_is_stable_across_instances() {
    let first = fetch_doc().await;
    let second = fetch_doc().await;
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// 2. Every schema reference resolves inside the document
// ---------------------------------------------------------------------------

#[tokio::test]
async fn schema_references_are_closed() {
    let doc = fetch_doc().await;
    let schemas = doc["components"]["schemas"]
        .as_object()
        .expect("components.schemas present");

    let mut refs = Vec::new();
    collect_refs(&doc, &mut refs);
    assert!(!refs.is_empty(), "a document without references is suspect");

    for target in refs {
        let name = target
            .strip_prefix("#/components/schemas/")
            .unwrap_or_else(|| panic!("non-local reference: {target}"));
        assert!(schemas.contains_key(name), "dangling reference: {target}");
    }
}

// ---------------------------------------------------------------------------
// 3. The path set matches the mounted router exactly
// ---------------------------------------------------------------------------

#[tokio::test]
async fn documented_paths_match_the_router() {
    let doc = fetch_doc().await;
    let documented: BTreeSet<String> = doc["paths"]
        .as_object()
        .expect("paths present")
        .keys()
        .cloned()
        .collect();

    let expected: BTreeSet<String> = [
        "/v1/shipments",
        "/v1/shipments/{id}",
        "/v1/shipments/{id}/requests",
        "/v1/requests/pending",
        "/v1/requests/{id}/decision",
        "/v1/shipments/{id}/location",
        "/v1/shipments/{id}/location/ws",
        "/v1/hubs",
        "/v1/hubs/{id}",
        "/v1/hubs/{id}/manager",
        "/v1/actors",
        "/v1/actors/{id}",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(documented, expected);

    // The location path carries both verbs.
    let location = doc["paths"]["/v1/shipments/{id}/location"]
        .as_object()
        .unwrap();
    assert!(location.contains_key("get"));
    assert!(location.contains_key("post"));
}

// ---------------------------------------------------------------------------
// 4. Enum schemas carry the frozen wire names
// ---------------------------------------------------------------------------

#[tokio::test]
async fn enum_schemas_carry_the_wire_names() {
    let doc = fetch_doc().await;

    let statuses: Vec<&str> = doc["components"]["schemas"]["ShipmentStatus"]["enum"]
        .as_array()
        .expect("ShipmentStatus enum")
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    for name in [
        "Pending",
        "Assigned",
        "On the way",
        "Reached",
        "Pending Receipt Approval",
        "Received",
        "Canceled",
    ] {
        assert!(statuses.contains(&name), "missing status {name}");
    }
    assert_eq!(statuses.len(), 7);

    let kinds: Vec<&str> = doc["components"]["schemas"]["RequestKind"]["enum"]
        .as_array()
        .expect("RequestKind enum")
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    for name in ["print", "pickup", "scan", "delivery", "receive", "receive-scan"] {
        assert!(kinds.contains(&name), "missing kind {name}");
    }
    assert_eq!(kinds.len(), 6);

    let roles: Vec<&str> = doc["components"]["schemas"]["ActorRole"]["enum"]
        .as_array()
        .expect("ActorRole enum")
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(roles.contains(&"hubManager"));

    let decisions: Vec<&str> = doc["components"]["schemas"]["RequestStatus"]["enum"]
        .as_array()
        .expect("RequestStatus enum")
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(decisions.contains(&"Pending Approval"));
}

// ---------------------------------------------------------------------------
// 5. Info, license, and the tag taxonomy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn info_license_and_tags_are_declared() {
    let doc = fetch_doc().await;

    assert_eq!(doc["info"]["title"], "Hubnet API");
    assert_eq!(doc["info"]["version"], "0.3.2");
    assert_eq!(doc["info"]["license"]["name"], "AGPL-3.0-or-later");

    let tags: BTreeSet<&str> = doc["tags"]
        .as_array()
        .expect("tags present")
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    let expected: BTreeSet<&str> = ["shipments", "requests", "location", "hubs", "actors"]
        .into_iter()
        .collect();
    assert_eq!(tags, expected);
}

// ---------------------------------------------------------------------------
// 6. Every operation is filed under a known tag
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_operation_is_tagged() {
    let doc = fetch_doc().await;
    let known: BTreeSet<&str> = ["shipments", "requests", "location", "hubs", "actors"]
        .into_iter()
        .collect();

    for (path, item) in doc["paths"].as_object().unwrap() {
        for method in ["get", "post", "put", "delete", "patch"] {
            let Some(op) = item.get(method) else { continue };
            let tag = op["tags"][0]
                .as_str()
                .unwrap_or_else(|| panic!("{method} {path} has no tag"));
            assert!(known.contains(tag), "{method} {path} uses unknown tag {tag}");
        }
    }
}
