//! Callbacks: the typed input/output units carried by a Node.
//!
//! On the wire every callback has the same shape:
//!
//! ```json
//! {"type": "NameCallback",
//!  "output": [{"name": "prompt", "value": "User Name"}],
//!  "input": [{"name": "IDToken1", "value": ""}],
//!  "_id": 0}
//! ```
//!
//! [`RawCallback`] holds exactly that payload. Variants wrap a
//! `RawCallback` and add typed getters and setters; they never keep state
//! outside of it, so serialising a variant is serialising its raw payload
//! and the round trip preserves output values and input order.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

pub mod attribute;
pub mod choice;
pub mod consent;
pub mod input;
pub mod output;
pub mod registry;
pub mod validated;

pub use attribute::{
    BooleanAttributeInputCallback, NumberAttributeInputCallback, StringAttributeInputCallback,
};
pub use choice::{ChoiceCallback, ConfirmationCallback};
pub use consent::{ConsentMappingCallback, KbaCreateCallback, TermsAndConditionsCallback};
pub use input::{HiddenValueCallback, NameCallback, PasswordCallback, TextInputCallback};
pub use output::{
    MessageType, MetadataCallback, PollingWaitCallback, SuspendedTextOutputCallback,
    TextOutputCallback,
};
pub use registry::{CallbackConstructor, CallbackRegistry};
pub use validated::{
    PolicyFailure, PolicyValidated, ValidatedCreatePasswordCallback,
    ValidatedCreateUsernameCallback,
};

/// Errors raised while building or filling a callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallbackError {
    /// No constructor is registered for the wire type.
    #[error("unsupported callback type: {callback_type}")]
    Unsupported { callback_type: String },

    /// The payload does not have the shape its type requires.
    #[error("malformed {callback_type}: {reason}")]
    Malformed { callback_type: String, reason: String },

    /// A setter was given a value the callback cannot accept.
    #[error("invalid input for {callback_type}: {reason}")]
    InvalidInput { callback_type: String, reason: String },
}

/// One `{"name": ..., "value": ...}` slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameValue {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

impl NameValue {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// The untyped wire payload of a callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCallback {
    #[serde(rename = "type")]
    pub callback_type: String,
    #[serde(default)]
    pub output: Vec<NameValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input: Vec<NameValue>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Position within the owning Node; not part of the wire payload.
    #[serde(skip)]
    pub index: usize,
}

impl RawCallback {
    pub fn new(callback_type: impl Into<String>) -> Self {
        Self {
            callback_type: callback_type.into(),
            output: Vec::new(),
            input: Vec::new(),
            id: None,
            index: 0,
        }
    }

    pub fn with_output(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.output.push(NameValue::new(name, value));
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.input.push(NameValue::new(name, value));
        self
    }

    pub fn output(&self, name: &str) -> Option<&Value> {
        self.output.iter().find(|slot| slot.name == name).map(|slot| &slot.value)
    }

    pub fn output_str(&self, name: &str) -> Option<&str> {
        self.output(name).and_then(Value::as_str)
    }

    pub fn output_bool(&self, name: &str) -> Option<bool> {
        self.output(name).and_then(Value::as_bool)
    }

    pub fn output_i64(&self, name: &str) -> Option<i64> {
        match self.output(name)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn output_strings(&self, name: &str) -> Vec<String> {
        self.output(name)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).map(str::to_owned).collect())
            .unwrap_or_default()
    }

    pub fn input_value(&self, position: usize) -> Option<&Value> {
        self.input.get(position).map(|slot| &slot.value)
    }

    /// Write into the input slot at `position`.
    pub fn set_input(
        &mut self,
        position: usize,
        value: impl Into<Value>,
    ) -> Result<(), CallbackError> {
        let callback_type = self.callback_type.clone();
        let slot = self.input.get_mut(position).ok_or_else(|| CallbackError::InvalidInput {
            callback_type,
            reason: format!("no input slot at position {position}"),
        })?;
        slot.value = value.into();
        Ok(())
    }

    /// Write into the input slot whose name ends with `suffix`
    /// (`IDToken1validateOnly`, `IDToken2question`, ...).
    pub fn set_input_by_suffix(
        &mut self,
        suffix: &str,
        value: impl Into<Value>,
    ) -> Result<(), CallbackError> {
        let callback_type = self.callback_type.clone();
        let slot = self
            .input
            .iter_mut()
            .find(|slot| slot.name.ends_with(suffix))
            .ok_or_else(|| CallbackError::InvalidInput {
                callback_type,
                reason: format!("no input slot named *{suffix}"),
            })?;
        slot.value = value.into();
        Ok(())
    }

    pub fn has_input_suffix(&self, suffix: &str) -> bool {
        self.input.iter().any(|slot| slot.name.ends_with(suffix))
    }

    pub fn require_inputs(&self, count: usize) -> Result<(), CallbackError> {
        if self.input.len() < count {
            let found = self.input.len();
            return Err(self.malformed(format!("expected {count} input slot(s), found {found}")));
        }
        Ok(())
    }

    pub fn require_output(&self, name: &str) -> Result<(), CallbackError> {
        if self.output(name).is_none() {
            return Err(self.malformed(format!("missing output `{name}`")));
        }
        Ok(())
    }

    pub fn malformed(&self, reason: impl Into<String>) -> CallbackError {
        CallbackError::Malformed {
            callback_type: self.callback_type.clone(),
            reason: reason.into(),
        }
    }

    pub fn invalid_input(&self, reason: impl Into<String>) -> CallbackError {
        CallbackError::InvalidInput {
            callback_type: self.callback_type.clone(),
            reason: reason.into(),
        }
    }

    /// Wire JSON for this callback.
    pub fn to_json(&self) -> Value {
        let slots = |slots: &[NameValue]| {
            Value::Array(slots.iter().map(|s| json!({"name": s.name, "value": s.value})).collect())
        };
        let mut object = Map::new();
        object.insert("type".into(), Value::String(self.callback_type.clone()));
        object.insert("output".into(), slots(&self.output));
        if !self.input.is_empty() {
            object.insert("input".into(), slots(&self.input));
        }
        if let Some(id) = self.id {
            object.insert("_id".into(), Value::from(id));
        }
        Value::Object(object)
    }
}

/// A typed view over one callback of a Node.
///
/// Object safe so a Node can hold a heterogeneous list; use
/// [`as_any`](Callback::as_any) (or `Node::callback::<T>()`) to recover the
/// concrete variant.
pub trait Callback: Send + Sync + fmt::Debug + 'static {
    fn raw(&self) -> &RawCallback;
    fn raw_mut(&mut self) -> &mut RawCallback;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_box(&self) -> Box<dyn Callback>;

    fn callback_type(&self) -> &str {
        &self.raw().callback_type
    }

    fn index(&self) -> usize {
        self.raw().index
    }

    fn to_json(&self) -> Value {
        self.raw().to_json()
    }
}

impl Clone for Box<dyn Callback> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl PartialEq for dyn Callback {
    fn eq(&self, other: &Self) -> bool {
        self.raw() == other.raw()
    }
}

/// A callback type that can be registered by its wire discriminant.
pub trait CallbackVariant: Callback + Sized {
    const TYPE: &'static str;

    fn from_raw(raw: RawCallback) -> Result<Self, CallbackError>;
}

/// The raw payload is itself a callback, for types a caller wants to pass
/// through untouched (`registry.register_fn("X", |raw| Ok(Box::new(raw)))`).
impl Callback for RawCallback {
    fn raw(&self) -> &RawCallback {
        self
    }

    fn raw_mut(&mut self) -> &mut RawCallback {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Callback> {
        Box::new(self.clone())
    }
}
