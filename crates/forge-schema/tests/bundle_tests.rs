//! Bundle Loading Tests
//!
//! Directory scan, bundle load, registry build and validation against the
//! files of a real directory.
//!
use forge_schema::prelude::*;
use forge_schema::{BundleMetadata, SchemaBundle, SchemaCache};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn write_bundle() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("Order.json"),
        serde_json::to_string_pretty(&json!({
            "type": "object",
            "endpoint": "orders",
            "required": ["number"],
            "properties": {
                "number": {"type": "string"},
                "customer": {
                    "$ref": "Customer.json",
                    "apiCreationStrategy": "parentFirstBodyId",
                    "childRefToParent": "orderId"
                }
            }
        }))
        .unwrap(),
    )
    .unwrap();
    fs::write(
        dir.path().join("Customer.yaml"),
        "type: object\nproperties:\n  name:\n    type: string\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("tenant.properties"),
        "route=https://api.acme.test\ncorsProxy=\n",
    )
    .unwrap();
    fs::write(dir.path().join("endpoints.properties"), "IN POST: /orders\n").unwrap();
    fs::write(dir.path().join("Broken.json"), "{ not json").unwrap();
    fs::write(dir.path().join("README.md"), "ignored").unwrap();
    dir
}

#[tokio::test]
async fn test_scan_lists_bundle_files_sorted() {
    let dir = write_bundle();
    let meta = BundleMetadata::scan(dir.path()).await.unwrap();

    let names: Vec<_> = meta.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Broken.json",
            "Customer.yaml",
            "Order.json",
            "endpoints.properties",
            "tenant.properties"
        ]
    );
}

#[tokio::test]
async fn test_load_skips_broken_files() {
    let dir = write_bundle();
    let meta = BundleMetadata::scan(dir.path()).await.unwrap();
    let bundle = SchemaBundle::load("acme", &meta).await;

    assert!(bundle.schemas.contains_key("Order"));
    assert!(bundle.schemas.contains_key("Customer"));
    assert!(!bundle.schemas.contains_key("Broken"));
    assert_eq!(
        bundle.property_map("tenant").unwrap().get("route").unwrap(),
        "https://api.acme.test"
    );
    assert_eq!(bundle.loose_endpoints, vec!["IN POST: /orders".to_string()]);
}

#[tokio::test]
async fn test_registry_validates_across_refs() {
    let dir = write_bundle();
    let meta = BundleMetadata::scan(dir.path()).await.unwrap();
    let registry: SchemaRegistry = SchemaBundle::load("acme", &meta).await.registry();

    assert_eq!(registry.resolve_endpoint("Order"), "orders");
    let link = registry
        .lookup("Order")
        .unwrap()
        .property("customer")
        .unwrap()
        .relation()
        .link()
        .cloned();
    assert_eq!(
        link,
        Some(Link::ParentBody {
            child_ref_to_parent: "orderId".to_string()
        })
    );

    let ok = registry
        .validate("Order", &json!({"number": "A-1", "customer": {"name": "Ada"}}))
        .unwrap();
    assert!(ok.valid, "{:?}", ok.errors);

    let bad = registry.validate("Order", &json!({"customer": {}})).unwrap();
    assert!(!bad.valid);
}

#[tokio::test]
async fn test_cache_reuses_unchanged_directory() {
    let dir = write_bundle();
    let cache = SchemaCache::new(16);

    let first = cache.load_dir("acme", dir.path()).await.unwrap();
    let second = cache.load_dir("acme", dir.path()).await.unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    fs::write(dir.path().join("Extra.json"), r#"{"properties": {}}"#).unwrap();
    let third = cache.load_dir("acme", dir.path()).await.unwrap();
    assert_ne!(first.hash, third.hash);
    assert!(third.registry.contains("Extra"));
}

#[tokio::test]
async fn test_scan_missing_directory_fails() {
    let err = BundleMetadata::scan("/definitely/not/here").await.unwrap_err();
    assert!(matches!(err, SchemaError::Io { .. }));
}
