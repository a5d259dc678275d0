//! Tests for form composition and aggregate validation.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use formwork::prelude::*;
use serde_json::json;

#[test]
fn test_snapshot_reads_raw_values() {
    let name = Field::text("hi");
    let form = Form::builder().field("a", name.clone()).build();
    assert_eq!(form.snapshot(), json!({"a": "hi"}));

    name.set("bye");
    assert_eq!(form.snapshot(), json!({"a": "bye"}));
}

#[tokio::test]
async fn test_snapshot_updates_before_validation_completes() {
    let name = Field::text("hi").rule_async(|_| async {
        tokio::task::yield_now().await;
        Err::<(), _>("rejected")
    });
    let form = Form::builder().field("a", name.clone()).build();

    name.set("bye");
    assert_eq!(name.status(), Some(Status::Pending));
    assert_eq!(form.snapshot(), json!({"a": "bye"}));

    name.settled().await;
    assert_eq!(form.snapshot(), json!({"a": "bye"}));
}

#[tokio::test]
async fn test_invalid_child_skips_form_validators() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let invalid = Field::text("").required("Name is required");
    let valid = Field::text("ok");
    let form = Form::builder()
        .field("name", invalid.clone())
        .field("other", valid.clone())
        .rule(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("Form rejects everything")
        })
        .build();

    let validation = form.validate().await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(validation.status(), Status::Invalid);
    assert!(validation.is_aggregate());
    assert!(validation.errors().is_empty());
    assert_eq!(form.errors(), invalid.errors());
    assert_eq!(form.errors(), vec![ValidationError::new("Name is required")]);
    assert!(form.form_errors().is_empty());
    assert_eq!(valid.status(), Some(Status::Valid));
}

#[tokio::test]
async fn test_form_validators_run_once_children_are_valid() {
    let password = Field::text("hunter22");
    let confirm = Field::text("hunter23");
    let form = Form::builder()
        .field("password", password.clone())
        .field("confirm", confirm.clone())
        .rule(|v| {
            if v["password"] == v["confirm"] {
                Ok(())
            } else {
                Err("Passwords differ")
            }
        })
        .build();

    let validation = form.validate().await;
    assert!(validation.is_invalid());
    assert!(!validation.is_aggregate());
    assert!(form.field_errors().is_empty());
    assert_eq!(form.errors(), vec![ValidationError::new("Passwords differ")]);
    assert_eq!(form.value(), None);

    confirm.set("hunter22");
    form.validate().await;
    assert_eq!(form.status(), Some(Status::Valid));
    assert_eq!(
        form.value(),
        Some(json!({"password": "hunter22", "confirm": "hunter22"}))
    );
}

#[tokio::test]
async fn test_validate_revalidates_every_child() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let name = Field::text("Ada").rule(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<(), ValidationError>(())
    });
    let form = Form::builder().field("name", name.clone()).build();

    assert!(name.validation().is_none());
    form.validate().await;
    form.validate().await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(name.value().as_deref(), Some("Ada"));
}

#[tokio::test]
async fn test_nested_forms() {
    let street = Field::text("").required("Street is required");
    let address = Form::builder().field("street", street.clone()).build();
    let form = Form::builder()
        .field("name", Field::text("Ada"))
        .field("address", address.clone())
        .build();

    assert_eq!(form.snapshot(), json!({"name": "Ada", "address": {"street": ""}}));

    form.validate().await;
    assert_eq!(form.status(), Some(Status::Invalid));
    assert_eq!(address.status(), Some(Status::Invalid));
    assert_eq!(form.errors(), vec![ValidationError::new("Street is required")]);

    street.set("Main St");
    form.validate().await;
    assert_eq!(form.status(), Some(Status::Valid));

    let nested: Form = form.field("address").unwrap();
    assert!(nested.ptr_eq(&address));
}

#[tokio::test]
async fn test_reset_recurses() {
    let name = Field::text("Ada").required("Required");
    let form = Form::builder().field("name", name.clone()).build();

    name.set("");
    form.validate().await;
    assert!(form.has_error());

    form.reset();
    assert!(form.validation().is_none());
    assert!(name.validation().is_none());
    assert_eq!(form.snapshot(), json!({"name": "Ada"}));
    assert!(!form.has_error());
}

#[tokio::test]
async fn test_form_set_error() {
    let form = Form::builder().field("name", Field::text("Ada")).build();
    form.validate().await;
    assert_eq!(form.status(), Some(Status::Valid));

    form.set_error("Server rejected the submission");
    assert_eq!(form.status(), Some(Status::Invalid));
    assert_eq!(form.error(), Some(ValidationError::new("Server rejected the submission")));
}

#[tokio::test]
async fn test_async_form_rule() {
    let form = Form::builder()
        .field("username", Field::text("admin"))
        .rule_async(|v| async move {
            tokio::task::yield_now().await;
            if v["username"] == "admin" {
                Err("Username is reserved")
            } else {
                Ok(())
            }
        })
        .build();

    let validation = form.validate().await;
    assert_eq!(validation.errors(), vec![ValidationError::new("Username is reserved")]);
}

#[tokio::test]
async fn test_settled_waits_for_form() {
    let form = Form::builder().field("name", Field::text("Ada")).build();
    assert!(form.settled().await.is_none());

    let run = form.validate();
    assert_eq!(form.status(), Some(Status::Pending));
    tokio::spawn(run);

    let validation = form.settled().await.unwrap();
    assert!(validation.is_valid());
}
