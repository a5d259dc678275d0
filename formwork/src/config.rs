//! Field configuration.

/// Per-field configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldConfig {
    /// Validate the initial value without waiting for a `set` or `validate`.
    ///
    /// The run starts the first time the field's validation is read, so the
    /// intermediate fields of a `rule` chain never validate. When false (the
    /// default) the field has no validation until the first `set` or
    /// `validate`.
    pub validate_on_create: bool,
}

impl FieldConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the initial value is validated on creation.
    pub fn validate_on_create(mut self, eager: bool) -> Self {
        self.validate_on_create = eager;
        self
    }

    /// Validate the initial value on creation.
    pub fn eager() -> Self {
        Self::new().validate_on_create(true)
    }
}
