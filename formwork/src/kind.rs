//! Field kinds and the value types that back them.

/// The closed set of field kinds an input adapter can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Number,
}

impl FieldKind {
    /// The adapter-facing name (`"text"` or `"number"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for String {}
    impl Sealed for f64 {}
}

/// A raw value a [`Field`](crate::Field) can hold.
///
/// Implemented for `String` (text fields) and `f64` (number fields). Each
/// kind knows how to coerce the string an input adapter hands over and how to
/// appear in a form snapshot.
pub trait FieldValue:
    sealed::Sealed + Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static
{
    /// The kind discriminant for this value type.
    const KIND: FieldKind;

    /// Coerce an adapter's string representation into a value.
    fn coerce(input: &str) -> Self;

    /// Render the value back into the adapter's string representation.
    fn to_input(&self) -> String;

    /// The value as it appears in a snapshot.
    fn to_json(&self) -> serde_json::Value;
}

impl FieldValue for String {
    const KIND: FieldKind = FieldKind::Text;

    fn coerce(input: &str) -> Self {
        input.to_string()
    }

    fn to_input(&self) -> String {
        self.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::String(self.clone())
    }
}

/// Unparsable input becomes `NaN`, mirroring how number inputs report an
/// empty or malformed entry.
impl FieldValue for f64 {
    const KIND: FieldKind = FieldKind::Number;

    fn coerce(input: &str) -> Self {
        input.trim().parse().unwrap_or(f64::NAN)
    }

    fn to_input(&self) -> String {
        if self.is_nan() {
            String::new()
        } else {
            self.to_string()
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::Number::from_f64(*self)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}
