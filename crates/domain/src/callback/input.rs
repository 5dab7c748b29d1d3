//! Plain input callbacks: a prompt and one value slot.

use crate::callback::RawCallback;
use crate::impl_callback;

/// Collects a user name.
#[derive(Debug, Clone, PartialEq)]
pub struct NameCallback {
    raw: RawCallback,
}

impl_callback!(NameCallback, "NameCallback", |raw| {
    raw.require_inputs(1)?;
    Ok(NameCallback { raw })
});

impl NameCallback {
    pub fn prompt(&self) -> Option<&str> {
        self.raw.output_str("prompt")
    }

    pub fn name(&self) -> Option<&str> {
        self.raw.input_value(0).and_then(|v| v.as_str())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        // slot 0 checked in from_raw
        let _ = self.raw.set_input(0, name.into());
    }
}

/// Collects a password.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordCallback {
    raw: RawCallback,
}

impl_callback!(PasswordCallback, "PasswordCallback", |raw| {
    raw.require_inputs(1)?;
    Ok(PasswordCallback { raw })
});

impl PasswordCallback {
    pub fn prompt(&self) -> Option<&str> {
        self.raw.output_str("prompt")
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        let _ = self.raw.set_input(0, password.into());
    }
}

/// Free text input with an optional default.
#[derive(Debug, Clone, PartialEq)]
pub struct TextInputCallback {
    raw: RawCallback,
}

impl_callback!(TextInputCallback, "TextInputCallback", |raw| {
    raw.require_inputs(1)?;
    Ok(TextInputCallback { raw })
});

impl TextInputCallback {
    pub fn prompt(&self) -> Option<&str> {
        self.raw.output_str("prompt")
    }

    pub fn default_text(&self) -> Option<&str> {
        self.raw.output_str("defaultText")
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        let _ = self.raw.set_input(0, value.into());
    }
}

/// Hidden field the client fills in programmatically.
#[derive(Debug, Clone, PartialEq)]
pub struct HiddenValueCallback {
    raw: RawCallback,
}

impl_callback!(HiddenValueCallback, "HiddenValueCallback", |raw| {
    raw.require_inputs(1)?;
    Ok(HiddenValueCallback { raw })
});

impl HiddenValueCallback {
    /// The field identifier, e.g. `clientScriptOutputData`.
    pub fn id(&self) -> Option<&str> {
        self.raw.output_str("id")
    }

    pub fn default_value(&self) -> Option<&str> {
        self.raw.output_str("value")
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        let _ = self.raw.set_input(0, value.into());
    }
}
