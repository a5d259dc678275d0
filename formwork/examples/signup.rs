//! Signup Example
//!
//! Walks a signup form through a typical session:
//! - field-level rules, including an async availability check
//! - a form-level rule comparing two fields
//! - a repeatable list of contact rows
//! - a server-side error injected after submission
//!
//! Validation activity is logged to `signup.log`.

use std::fs::File;
use std::time::Duration;

use formwork::prelude::*;
use log::LevelFilter;
use serde::Deserialize;
use simplelog::{Config, WriteLogger};

#[derive(Debug, Deserialize)]
struct Signup {
    username: String,
    email: String,
    age: f64,
    contacts: Vec<Contact>,
}

#[derive(Debug, Deserialize)]
struct Contact {
    name: String,
}

fn contact(name: &str) -> Form {
    Form::builder()
        .field("name", Field::text(name).required("Contact name is required"))
        .build()
}

fn print_errors(label: &str, errors: &[ValidationError]) {
    if errors.is_empty() {
        println!("{label}: no errors");
    }
    for error in errors {
        println!("{label}: {error}");
    }
}

#[tokio::main]
async fn main() {
    if let Ok(log_file) = File::create("signup.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, Config::default(), log_file);
    }

    let username = Field::text("")
        .required("Username is required")
        .min_length(3, "Username must be at least 3 characters")
        .rule_async(|name: String| async move {
            // Stand-in for a remote availability lookup
            tokio::time::sleep(Duration::from_millis(20)).await;
            if name == "admin" {
                Err("Username is taken")
            } else {
                Ok(())
            }
        });
    let email = Field::text("")
        .required("Email is required")
        .email("Please enter a valid email");
    let password = Field::text("").min_length(8, "Password must be at least 8 characters");
    let confirm = Field::text("");
    let age = Field::number(f64::NAN)
        .finite("Age is required")
        .min(13.0, "You must be at least 13")
        .integer("Age must be a whole number");
    let contacts = FormArray::new([contact("")]);

    let form = Form::builder()
        .field("username", username.clone())
        .field("email", email.clone())
        .field("password", password.clone())
        .field("confirm", confirm.clone())
        .field("age", age.clone())
        .field("contacts", contacts.clone())
        .rule(|v| {
            if v["password"] == v["confirm"] {
                Ok(())
            } else {
                Err("Passwords do not match")
            }
        })
        .build();

    form.validate().await;
    println!("first submit: {:?}", form.status());
    print_errors("first submit", &form.errors());

    username.set_input("admin");
    email.set_input("ada@example.com");
    password.set_input("correct horse");
    confirm.set_input("correct horse battery");
    age.set_input("36");
    if let Some(row) = contacts.get(0)
        && let Ok(name) = row.field::<Field<String>>("name")
    {
        name.set_input("Grace");
    }
    contacts.add(contact("Linus"));

    form.validate().await;
    println!("second submit: {:?}", form.status());
    print_errors("second submit", &form.errors());

    username.set_input("ada");
    confirm.set_input("correct horse");
    form.validate().await;
    println!("third submit: {:?}", form.status());
    print_errors("third submit", &form.errors());

    match form.value_as::<Signup>() {
        Ok(Some(signup)) => println!(
            "accepted {} <{}>, age {}, {} contacts ({})",
            signup.username,
            signup.email,
            signup.age,
            signup.contacts.len(),
            signup
                .contacts
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Ok(None) => println!("form is not valid yet"),
        Err(e) => println!("unexpected form shape: {e}"),
    }

    // The server had the final word
    email.set_error("This email is already registered");
    print_errors("after server check", &form.errors());

    form.reset();
    println!("after reset: {}", form.snapshot());
}
