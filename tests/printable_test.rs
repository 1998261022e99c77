//! Integration tests for the masked, printable view of a config.

use envtree_rs::env::EnvSnapshot;
use envtree_rs::printable::{MASK, NOT_SET};
use envtree_rs::schema::{FieldDefault, FieldSpec, FieldType, Schema};
use envtree_rs::{ResolveOptions, resolve_from};
use serde_json::json;

static SERVICE: Schema = Schema::new(
    "Service",
    &[
        FieldSpec::new("host", FieldType::Str).default(FieldDefault::Str("localhost")),
        FieldSpec::new("api_key", FieldType::Str).default(FieldDefault::Str("secret123")),
        FieldSpec::new("password", FieldType::Str).default(FieldDefault::Str("mypassword")),
        FieldSpec::new("token", FieldType::Str).default(FieldDefault::Str("tok-abcdef")),
        FieldSpec::new("admin_pw", FieldType::Str).default(FieldDefault::Str("")),
        FieldSpec::new("client_secret", FieldType::Optional(&FieldType::Str)),
        FieldSpec::new("signing_key", FieldType::Int).default(FieldDefault::Int(42)),
    ],
);

#[test]
fn sensitive_fields_are_masked() {
    let config = SERVICE.defaults().unwrap();
    let printable = config.printable();

    assert_eq!(printable["host"], json!("localhost"));
    assert_eq!(printable["api_key"], json!("se...23"));
    assert_eq!(printable["password"], json!("my...rd"));
    assert_eq!(printable["token"], json!("tok-abcdef"));
    assert_eq!(printable["admin_pw"], json!(NOT_SET));
    assert_eq!(printable["client_secret"], json!(NOT_SET));
    assert_eq!(printable["signing_key"], json!(MASK));
}

#[test]
fn extra_fields_are_masked_too() {
    let env = EnvSnapshot::from_vars(
        [("SVC_DB_PASSWORD", "hunter2hunter2"), ("SVC_REGION", "eu-west-1")],
        "SVC_",
    );
    let config = resolve_from(&SERVICE, &env, &ResolveOptions::new("SVC_")).unwrap();
    let printable = config.printable();

    assert_eq!(printable["db_password"], json!("hu...r2"));
    assert_eq!(printable["region"], json!("eu-west-1"));
    // the unmasked dump is untouched
    assert_eq!(config.dump()["db_password"], json!("hunter2hunter2"));
}

#[test]
fn secret_accessor_hides_value_from_debug() {
    use envtree_rs::config::secrets::ExposeSecret;

    let config = SERVICE.defaults().unwrap();
    let secret = config.secret("api_key").unwrap();
    assert_eq!(secret.expose_secret(), "secret123");
    assert!(!format!("{secret:?}").contains("secret123"));
    assert!(config.secret("missing").is_none());
}
