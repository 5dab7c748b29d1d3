//! One step of an authentication tree.

use serde_json::{Map, Value};

use crate::callback::{Callback, CallbackRegistry};
use crate::errors::{AuthError, Result};
use crate::types::token::SsoToken;

const AUTH_ID: &str = "authId";
const STAGE: &str = "stage";
const HEADER: &str = "header";
const DESCRIPTION: &str = "description";
const CALLBACKS: &str = "callbacks";
const RESERVED_KEYS: [&str; 5] = [AUTH_ID, STAGE, HEADER, DESCRIPTION, CALLBACKS];

/// A Node returned by `/authenticate`.
///
/// `auth_id` is opaque: it is echoed back verbatim on submission and never
/// inspected. The caller owns the Node between round trips and fills in its
/// callbacks; nothing else about it changes.
#[derive(Debug, Clone)]
pub struct Node {
    pub auth_id: String,
    pub stage: Option<String>,
    pub header: Option<String>,
    pub description: Option<String>,
    /// Any other top-level members of the server response.
    pub additional_metadata: Map<String, Value>,
    callbacks: Vec<Box<dyn Callback>>,
}

/// Result of submitting a Node. Failures travel in the `Err` side.
#[derive(Debug, Clone)]
pub enum NextStep {
    Continue(Node),
    Success(SsoToken),
}

impl Node {
    pub fn new(auth_id: impl Into<String>, callbacks: Vec<Box<dyn Callback>>) -> Self {
        Self {
            auth_id: auth_id.into(),
            stage: None,
            header: None,
            description: None,
            additional_metadata: Map::new(),
            callbacks,
        }
    }

    /// Build a Node from a response body, resolving each callback through
    /// `registry`.
    pub fn from_json(value: &Value, registry: &CallbackRegistry) -> Result<Self> {
        let object =
            value.as_object().ok_or_else(|| AuthError::parse("node is not a JSON object"))?;
        let auth_id = object
            .get(AUTH_ID)
            .and_then(Value::as_str)
            .ok_or_else(|| AuthError::parse("node has no authId"))?;
        let callbacks = object
            .get(CALLBACKS)
            .and_then(Value::as_array)
            .ok_or_else(|| AuthError::parse("node has no callbacks array"))?
            .iter()
            .enumerate()
            .map(|(index, callback)| registry.build(callback, index))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_owned);
        let additional_metadata = object
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            auth_id: auth_id.to_string(),
            stage: text(STAGE),
            header: text(HEADER),
            description: text(DESCRIPTION),
            additional_metadata,
            callbacks,
        })
    }

    /// Request body for the next `/authenticate` call.
    pub fn to_json(&self) -> Value {
        let mut object = self.additional_metadata.clone();
        object.insert(AUTH_ID.into(), Value::String(self.auth_id.clone()));
        let texts =
            [(STAGE, &self.stage), (HEADER, &self.header), (DESCRIPTION, &self.description)];
        for (key, value) in texts {
            if let Some(value) = value {
                object.insert(key.into(), Value::String(value.clone()));
            }
        }
        let callbacks = self.callbacks.iter().map(|c| c.to_json()).collect();
        object.insert(CALLBACKS.into(), Value::Array(callbacks));
        Value::Object(object)
    }

    pub fn callbacks(&self) -> &[Box<dyn Callback>] {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut [Box<dyn Callback>] {
        &mut self.callbacks
    }

    pub fn get(&self, index: usize) -> Option<&dyn Callback> {
        self.callbacks.get(index).map(|callback| &**callback)
    }

    /// First callback of type `T`.
    pub fn callback<T: Callback>(&self) -> Option<&T> {
        self.callbacks.iter().find_map(|c| c.as_any().downcast_ref::<T>())
    }

    pub fn callback_mut<T: Callback>(&mut self) -> Option<&mut T> {
        self.callbacks.iter_mut().find_map(|c| c.as_any_mut().downcast_mut::<T>())
    }

    /// Every callback of type `T`, in Node order.
    pub fn callbacks_of<T: Callback>(&self) -> impl Iterator<Item = &T> {
        self.callbacks.iter().filter_map(|c| c.as_any().downcast_ref::<T>())
    }

    /// Replace the callback at the replacement's own index.
    pub fn set_callback(&mut self, callback: Box<dyn Callback>) -> Result<()> {
        let index = callback.index();
        let slot = self.callbacks.get_mut(index).ok_or_else(|| {
            AuthError::illegal_state(format!("node has no callback at index {index}"))
        })?;
        if slot.callback_type() != callback.callback_type() {
            return Err(AuthError::illegal_state(format!(
                "cannot replace {} at index {index} with {}",
                slot.callback_type(),
                callback.callback_type()
            )));
        }
        *slot = callback;
        Ok(())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.auth_id == other.auth_id
            && self.stage == other.stage
            && self.header == other.header
            && self.description == other.description
            && self.additional_metadata == other.additional_metadata
            && self.callbacks.len() == other.callbacks.len()
            && self.callbacks.iter().zip(&other.callbacks).all(|(a, b)| a.raw() == b.raw())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::callback::{NameCallback, PasswordCallback, TextOutputCallback};

    fn login_page() -> Value {
        json!({
            "authId": "eyJ0eXAiOiJKV1QiLCJhbGciOiJIUzI1NiJ9.e30.sig",
            "stage": "UsernamePassword",
            "header": "Sign In",
            "description": "Enter your credentials",
            "template": "",
            "callbacks": [
                {
                    "type": "NameCallback",
                    "output": [{"name": "prompt", "value": "User Name"}],
                    "input": [{"name": "IDToken1", "value": ""}],
                    "_id": 0
                },
                {
                    "type": "PasswordCallback",
                    "output": [{"name": "prompt", "value": "Password"}],
                    "input": [{"name": "IDToken2", "value": ""}],
                    "_id": 1
                },
                {
                    "type": "TextOutputCallback",
                    "output": [
                        {"name": "message", "value": "Hello"},
                        {"name": "messageType", "value": "0"}
                    ]
                }
            ]
        })
    }

    fn parse(value: &Value) -> Node {
        Node::from_json(value, &CallbackRegistry::with_defaults()).unwrap()
    }

    #[test]
    fn node_round_trips_including_metadata() {
        let mut node = parse(&login_page());
        node.callback_mut::<NameCallback>().unwrap().set_name("tester");
        node.callback_mut::<PasswordCallback>().unwrap().set_password("password");

        let reparsed = parse(&node.to_json());

        assert_eq!(reparsed, node);
        assert_eq!(reparsed.additional_metadata.get("template"), Some(&json!("")));
        assert_eq!(reparsed.stage.as_deref(), Some("UsernamePassword"));
    }

    #[test]
    fn unfilled_node_serializes_to_original_payload() {
        assert_eq!(parse(&login_page()).to_json(), login_page());
    }

    #[test]
    fn callbacks_keep_order_and_index() {
        let node = parse(&login_page());

        let types: Vec<&str> = node.callbacks().iter().map(|c| c.callback_type()).collect();
        assert_eq!(types, ["NameCallback", "PasswordCallback", "TextOutputCallback"]);
        assert_eq!(node.get(2).map(|c| c.index()), Some(2));
        assert_eq!(node.callbacks_of::<TextOutputCallback>().count(), 1);
    }

    #[test]
    fn unknown_callback_fails_node() {
        let mut payload = login_page();
        payload["callbacks"][0]["type"] = json!("DeviceProfileCallback");

        let err = Node::from_json(&payload, &CallbackRegistry::with_defaults()).unwrap_err();

        assert_eq!(
            err,
            AuthError::UnsupportedCallback { callback_type: "DeviceProfileCallback".into() }
        );
    }

    #[test]
    fn set_callback_replaces_by_index() {
        let mut node = parse(&login_page());
        let mut replacement = node.callback::<NameCallback>().unwrap().clone();
        replacement.set_name("other");

        node.set_callback(Box::new(replacement)).unwrap();

        assert_eq!(node.callback::<NameCallback>().unwrap().name(), Some("other"));
    }

    #[test]
    fn set_callback_rejects_type_mismatch() {
        let mut node = parse(&login_page());
        let mut moved = node.callback::<PasswordCallback>().unwrap().clone();
        moved.raw_mut().index = 0;

        assert!(matches!(node.set_callback(Box::new(moved)), Err(AuthError::IllegalState(_))));
    }

    #[test]
    fn missing_auth_id_is_parse_error() {
        let registry = CallbackRegistry::with_defaults();
        let err = Node::from_json(&json!({"callbacks": []}), &registry).unwrap_err();

        assert!(matches!(err, AuthError::Parse(_)));
    }
}
