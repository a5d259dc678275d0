//! Tests for form arrays.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use formwork::prelude::*;
use serde_json::json;

fn contact(name: &str) -> Form {
    Form::builder()
        .field("name", Field::text(name).required("Name is required"))
        .build()
}

#[test]
fn test_remove_by_reference_keeps_remaining_row() {
    let first = contact("Ada");
    let second = contact("Grace");
    let rows = FormArray::new([first.clone(), second.clone()]);

    let removed = rows.remove(&first).unwrap();
    assert!(removed.ptr_eq(&first));
    assert_eq!(rows.len(), 1);
    assert!(rows.get(0).unwrap().ptr_eq(&second));
    assert_eq!(rows.snapshot(), json!([{"name": "Grace"}]));
}

#[test]
fn test_remove_by_index() {
    let rows = FormArray::new([contact("a"), contact("b"), contact("c")]);
    let removed = rows.remove(1usize).unwrap();

    assert_eq!(removed.snapshot(), json!({"name": "b"}));
    assert_eq!(rows.snapshot(), json!([{"name": "a"}, {"name": "c"}]));
}

#[test]
fn test_remove_missing_row_is_a_no_op() {
    let kept = contact("Ada");
    let rows = FormArray::new([kept.clone()]);
    rows.clear_dirty();

    assert!(rows.remove(&contact("Ada")).is_none());
    assert!(rows.remove(5usize).is_none());
    assert_eq!(rows.len(), 1);
    assert!(rows.get(0).unwrap().ptr_eq(&kept));
    assert!(!rows.is_dirty());
}

#[test]
fn test_add_appends() {
    let rows = FormArray::new([contact("Ada")]);
    rows.add(contact("Grace")).add(contact("Linus"));

    assert_eq!(rows.len(), 3);
    assert!(rows.is_dirty());
    assert_eq!(
        rows.snapshot(),
        json!([{"name": "Ada"}, {"name": "Grace"}, {"name": "Linus"}])
    );
}

#[tokio::test]
async fn test_invalid_row_skips_array_validators() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let rows = FormArray::builder()
        .row(contact("Ada"))
        .row(contact(""))
        .rule(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("Array rejects everything")
        })
        .build();

    let validation = rows.validate().await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(validation.is_aggregate());
    assert_eq!(rows.errors(), vec![ValidationError::new("Name is required")]);
    assert_eq!(rows.get(0).unwrap().status(), Some(Status::Valid));
    assert_eq!(rows.get(1).unwrap().status(), Some(Status::Invalid));
}

#[tokio::test]
async fn test_array_rule_sees_rows() {
    let rows = FormArray::builder()
        .rule(|v| match v.as_array() {
            Some(rows) if !rows.is_empty() => Ok(()),
            _ => Err("Add at least one contact"),
        })
        .build();

    rows.validate().await;
    assert_eq!(rows.errors(), vec![ValidationError::new("Add at least one contact")]);
    assert!(rows.row_errors().is_empty());

    rows.add(contact("Ada"));
    rows.validate().await;
    assert_eq!(rows.status(), Some(Status::Valid));
    assert_eq!(rows.value(), Some(json!([{"name": "Ada"}])));
}

#[tokio::test]
async fn test_reset_restores_initial_rows() {
    let first = contact("Ada");
    let second = contact("Grace");
    let rows = FormArray::new([first.clone(), second.clone()]);

    let name: Field<String> = first.field("name").unwrap();
    name.set("");
    rows.remove(&second);
    rows.add(contact("Linus"));
    rows.add(contact("Ken"));
    rows.validate().await;
    assert!(rows.has_error());

    rows.reset();
    assert_eq!(rows.len(), 2);
    assert!(rows.get(0).unwrap().ptr_eq(&first));
    assert!(rows.get(1).unwrap().ptr_eq(&second));
    assert!(rows.validation().is_none());
    assert!(name.validation().is_none());
    assert_eq!(rows.snapshot(), json!([{"name": "Ada"}, {"name": "Grace"}]));
}

#[tokio::test]
async fn test_array_inside_form() {
    let contacts = FormArray::new([contact("Ada")]);
    let form = Form::builder()
        .field("title", Field::text("Team"))
        .field("contacts", contacts.clone())
        .build();

    assert_eq!(
        form.snapshot(),
        json!({"title": "Team", "contacts": [{"name": "Ada"}]})
    );

    contacts.add(contact(""));
    form.validate().await;
    assert_eq!(form.status(), Some(Status::Invalid));
    assert_eq!(form.errors(), vec![ValidationError::new("Name is required")]);

    contacts.remove(1usize);
    form.validate().await;
    assert_eq!(form.status(), Some(Status::Valid));
}

#[tokio::test]
async fn test_value_as_rows() {
    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Contact {
        name: String,
    }

    let rows = FormArray::new([contact("Ada"), contact("Grace")]);
    rows.validate().await;

    let contacts: Vec<Contact> = rows.value_as().unwrap().unwrap();
    assert_eq!(
        contacts,
        vec![
            Contact { name: "Ada".into() },
            Contact { name: "Grace".into() }
        ]
    );
}
