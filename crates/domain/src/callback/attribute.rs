//! Profile attribute collectors used by registration and progressive
//! profiling trees.

use serde_json::Value;

use crate::callback::validated::PolicyValidated;
use crate::callback::{CallbackError, RawCallback};
use crate::impl_callback;

fn attribute_name(raw: &RawCallback) -> Option<&str> {
    raw.output_str("name")
}

fn is_required(raw: &RawCallback) -> bool {
    raw.output_bool("required").unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringAttributeInputCallback {
    raw: RawCallback,
}

impl_callback!(StringAttributeInputCallback, "StringAttributeInputCallback", |raw| {
    raw.require_inputs(1)?;
    Ok(StringAttributeInputCallback { raw })
});

impl PolicyValidated for StringAttributeInputCallback {}

impl StringAttributeInputCallback {
    /// Attribute on the managed object, e.g. `givenName`.
    pub fn name(&self) -> Option<&str> {
        attribute_name(&self.raw)
    }

    pub fn prompt(&self) -> Option<&str> {
        self.raw.output_str("prompt")
    }

    pub fn required(&self) -> bool {
        is_required(&self.raw)
    }

    pub fn value(&self) -> Option<&str> {
        self.raw.input_value(0).and_then(Value::as_str)
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        let _ = self.raw.set_input(0, value.into());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberAttributeInputCallback {
    raw: RawCallback,
}

impl_callback!(NumberAttributeInputCallback, "NumberAttributeInputCallback", |raw| {
    raw.require_inputs(1)?;
    Ok(NumberAttributeInputCallback { raw })
});

impl PolicyValidated for NumberAttributeInputCallback {}

impl NumberAttributeInputCallback {
    pub fn name(&self) -> Option<&str> {
        attribute_name(&self.raw)
    }

    pub fn prompt(&self) -> Option<&str> {
        self.raw.output_str("prompt")
    }

    pub fn required(&self) -> bool {
        is_required(&self.raw)
    }

    pub fn value(&self) -> Option<f64> {
        self.raw.input_value(0).and_then(Value::as_f64)
    }

    /// Rejects NaN and infinities, which have no JSON form.
    pub fn set_value(&mut self, value: f64) -> Result<(), CallbackError> {
        let number = serde_json::Number::from_f64(value)
            .ok_or_else(|| self.raw.invalid_input(format!("{value} is not a finite number")))?;
        self.raw.set_input(0, Value::Number(number))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BooleanAttributeInputCallback {
    raw: RawCallback,
}

impl_callback!(BooleanAttributeInputCallback, "BooleanAttributeInputCallback", |raw| {
    raw.require_inputs(1)?;
    Ok(BooleanAttributeInputCallback { raw })
});

impl PolicyValidated for BooleanAttributeInputCallback {}

impl BooleanAttributeInputCallback {
    pub fn name(&self) -> Option<&str> {
        attribute_name(&self.raw)
    }

    pub fn prompt(&self) -> Option<&str> {
        self.raw.output_str("prompt")
    }

    pub fn required(&self) -> bool {
        is_required(&self.raw)
    }

    pub fn value(&self) -> Option<bool> {
        self.raw.input_value(0).and_then(Value::as_bool)
    }

    pub fn set_value(&mut self, value: bool) {
        let _ = self.raw.set_input(0, value);
    }
}
