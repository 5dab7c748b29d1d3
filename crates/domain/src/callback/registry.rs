//! Maps wire `type` strings to callback constructors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::{
    BooleanAttributeInputCallback, Callback, CallbackError, CallbackVariant, ChoiceCallback,
    ConfirmationCallback, ConsentMappingCallback, HiddenValueCallback, KbaCreateCallback,
    MetadataCallback, NameCallback, NumberAttributeInputCallback, PasswordCallback,
    PollingWaitCallback, RawCallback, StringAttributeInputCallback, SuspendedTextOutputCallback,
    TermsAndConditionsCallback, TextInputCallback, TextOutputCallback,
    ValidatedCreatePasswordCallback, ValidatedCreateUsernameCallback,
};

/// Builds a boxed callback from its raw payload.
pub type CallbackConstructor =
    Arc<dyn Fn(RawCallback) -> Result<Box<dyn Callback>, CallbackError> + Send + Sync>;

/// Registry of constructible callback types.
///
/// An unknown `type` is always an error; there is no fallback variant.
#[derive(Clone)]
pub struct CallbackRegistry {
    constructors: HashMap<String, CallbackConstructor>,
}

impl CallbackRegistry {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self { constructors: HashMap::new() }
    }

    /// A registry with every built-in callback type registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry
            .register::<NameCallback>()
            .register::<PasswordCallback>()
            .register::<TextInputCallback>()
            .register::<HiddenValueCallback>()
            .register::<ChoiceCallback>()
            .register::<ConfirmationCallback>()
            .register::<TextOutputCallback>()
            .register::<SuspendedTextOutputCallback>()
            .register::<MetadataCallback>()
            .register::<PollingWaitCallback>()
            .register::<StringAttributeInputCallback>()
            .register::<NumberAttributeInputCallback>()
            .register::<BooleanAttributeInputCallback>()
            .register::<ValidatedCreateUsernameCallback>()
            .register::<ValidatedCreatePasswordCallback>()
            .register::<KbaCreateCallback>()
            .register::<TermsAndConditionsCallback>()
            .register::<ConsentMappingCallback>();
        registry
    }

    /// Register (or replace) a variant under its own wire type.
    pub fn register<T: CallbackVariant>(&mut self) -> &mut Self {
        let constructor: CallbackConstructor = Arc::new(|raw| {
            T::from_raw(raw).map(|callback| Box::new(callback) as Box<dyn Callback>)
        });
        self.constructors.insert(T::TYPE.to_string(), constructor);
        self
    }

    /// Register (or replace) an arbitrary constructor for `callback_type`.
    pub fn register_fn<F>(&mut self, callback_type: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(RawCallback) -> Result<Box<dyn Callback>, CallbackError> + Send + Sync + 'static,
    {
        self.constructors.insert(callback_type.into(), Arc::new(constructor));
        self
    }

    pub fn unregister(&mut self, callback_type: &str) -> bool {
        self.constructors.remove(callback_type).is_some()
    }

    pub fn contains(&self, callback_type: &str) -> bool {
        self.constructors.contains_key(callback_type)
    }

    /// Build the callback at `index` of a Node from its JSON object.
    pub fn build(&self, value: &Value, index: usize) -> Result<Box<dyn Callback>, CallbackError> {
        let mut raw: RawCallback = serde_json::from_value(value.clone()).map_err(|e| {
            CallbackError::Malformed {
                callback_type: value
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("<missing type>")
                    .to_string(),
                reason: e.to_string(),
            }
        })?;
        raw.index = index;

        let constructor = self
            .constructors
            .get(&raw.callback_type)
            .ok_or_else(|| CallbackError::Unsupported {
                callback_type: raw.callback_type.clone(),
            })?;
        constructor(raw)
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        types.sort_unstable();
        f.debug_struct("CallbackRegistry").field("types", &types).finish()
    }
}
