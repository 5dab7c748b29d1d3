//! Callbacks validated server-side against a policy set.
//!
//! The server reports violations in `failedPolicies`, an array whose items
//! are JSON documents (usually encoded as strings):
//!
//! ```json
//! "{\"params\":{\"minLength\":8},\"policyRequirement\":\"MIN_LENGTH\"}"
//! ```
//!
//! Setting `validateOnly` to `true` asks the server to evaluate the
//! policies and return the same Node without advancing the tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::callback::{Callback, CallbackError, RawCallback};
use crate::impl_callback;

/// One violated policy requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyFailure {
    pub policy_requirement: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

impl PolicyFailure {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(encoded) => serde_json::from_str(encoded).map_err(|e| e.to_string()),
            Value::Object(_) => serde_json::from_value(value.clone()).map_err(|e| e.to_string()),
            other => Err(format!("unexpected failed policy entry: {other}")),
        }
    }

    pub fn param(&self, name: &str) -> Option<String> {
        self.params.get(name).map(|value| match value {
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map_or_else(|| item.to_string(), str::to_owned))
                .collect::<Vec<_>>()
                .join(", "),
            other => other.to_string(),
        })
    }

    /// Human readable message for the field labelled `prompt`.
    pub fn describe(&self, prompt: &str) -> String {
        let param = |name: &str| self.param(name).unwrap_or_default();
        match self.policy_requirement.as_str() {
            "REQUIRED" => format!("{prompt} is required"),
            "UNIQUE" => format!("{prompt} must be unique"),
            "MIN_LENGTH" => {
                format!("{prompt} must be at least {} character(s)", param("minLength"))
            }
            "MAX_LENGTH" => {
                format!("{prompt} must be at most {} character(s)", param("maxLength"))
            }
            "CANNOT_CONTAIN_CHARACTERS" => {
                format!("{prompt} must not contain: {}", param("forbiddenChars"))
            }
            "CANNOT_CONTAIN_OTHERS" => {
                format!("{prompt} must not contain: {}", param("disallowedFields"))
            }
            "AT_LEAST_X_CAPITAL_LETTERS" => {
                format!("{prompt} must contain at least {} capital letter(s)", param("numCaps"))
            }
            "AT_LEAST_X_NUMBERS" => {
                format!("{prompt} must contain at least {} numeric value(s)", param("numNums"))
            }
            "VALID_EMAIL_ADDRESS_FORMAT" => format!("{prompt} must be a valid email address"),
            "VALID_USERNAME" => format!("{prompt} is not a valid username"),
            "MATCH_REGEXP" => format!("{prompt} has an invalid format"),
            other => format!("{prompt}: {other}"),
        }
    }
}

/// Accessors shared by every policy-validated callback.
pub trait PolicyValidated: Callback {
    fn policies(&self) -> Option<&Value> {
        self.raw().output("policies")
    }

    fn failed_policies(&self) -> Result<Vec<PolicyFailure>, CallbackError> {
        let Some(entries) = self.raw().output("failedPolicies") else {
            return Ok(Vec::new());
        };
        let entries = entries
            .as_array()
            .ok_or_else(|| self.raw().malformed("failedPolicies is not an array"))?;
        entries
            .iter()
            .map(|entry| {
                PolicyFailure::from_value(entry).map_err(|reason| self.raw().malformed(reason))
            })
            .collect()
    }

    /// Ask the server to only validate this value on the next submission.
    fn set_validate_only(&mut self, validate_only: bool) -> Result<(), CallbackError> {
        self.raw_mut().set_input_by_suffix("validateOnly", validate_only)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCreateUsernameCallback {
    raw: RawCallback,
}

impl_callback!(ValidatedCreateUsernameCallback, "ValidatedCreateUsernameCallback", |raw| {
    raw.require_inputs(1)?;
    Ok(ValidatedCreateUsernameCallback { raw })
});

impl PolicyValidated for ValidatedCreateUsernameCallback {}

impl ValidatedCreateUsernameCallback {
    pub fn prompt(&self) -> Option<&str> {
        self.raw.output_str("prompt")
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        let _ = self.raw.set_input(0, username.into());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCreatePasswordCallback {
    raw: RawCallback,
}

impl_callback!(ValidatedCreatePasswordCallback, "ValidatedCreatePasswordCallback", |raw| {
    raw.require_inputs(1)?;
    Ok(ValidatedCreatePasswordCallback { raw })
});

impl PolicyValidated for ValidatedCreatePasswordCallback {}

impl ValidatedCreatePasswordCallback {
    pub fn prompt(&self) -> Option<&str> {
        self.raw.output_str("prompt")
    }

    pub fn echo_on(&self) -> bool {
        self.raw.output_bool("echoOn").unwrap_or(false)
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        let _ = self.raw.set_input(0, password.into());
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::callback::CallbackVariant;

    fn password_callback() -> ValidatedCreatePasswordCallback {
        ValidatedCreatePasswordCallback::from_raw(
            serde_json::from_value(json!({
                "type": "ValidatedCreatePasswordCallback",
                "output": [
                    {"name": "echoOn", "value": false},
                    {"name": "policies", "value": {"policyRequirements": ["MIN_LENGTH"]}},
                    {"name": "failedPolicies", "value": [
                        "{ \"params\": { \"minLength\": 8 }, \
                         \"policyRequirement\": \"MIN_LENGTH\" }",
                        {
                            "params": {"forbiddenChars": ["$", "%"]},
                            "policyRequirement": "CANNOT_CONTAIN_CHARACTERS"
                        }
                    ]},
                    {"name": "validateOnly", "value": false},
                    {"name": "prompt", "value": "Password"}
                ],
                "input": [
                    {"name": "IDToken2", "value": ""},
                    {"name": "IDToken2validateOnly", "value": false}
                ]
            }))
            .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn failed_policies_parse_strings_and_objects() {
        let failures = password_callback().failed_policies().unwrap();

        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].policy_requirement, "MIN_LENGTH");
        assert_eq!(failures[0].param("minLength").as_deref(), Some("8"));
        assert_eq!(failures[1].describe("Password"), "Password must not contain: $, %");
    }

    #[test]
    fn validate_only_flag_is_written_to_its_slot() {
        let mut callback = password_callback();

        callback.set_password("secret");
        callback.set_validate_only(true).unwrap();

        assert_eq!(callback.raw().input_value(0), Some(&json!("secret")));
        assert_eq!(callback.raw().input_value(1), Some(&json!(true)));
    }

    #[test]
    fn describe_falls_back_to_requirement_tag() {
        let failure =
            PolicyFailure { policy_requirement: "DICTIONARY".into(), params: BTreeMap::new() };
        let min_length = PolicyFailure {
            policy_requirement: "MIN_LENGTH".into(),
            params: BTreeMap::from([("minLength".to_string(), json!(8))]),
        };

        assert_eq!(failure.describe("Password"), "Password: DICTIONARY");
        assert_eq!(min_length.describe("Password"), "Password must be at least 8 character(s)");
    }

    #[test]
    fn missing_failed_policies_is_empty() {
        let callback = ValidatedCreateUsernameCallback::from_raw(
            serde_json::from_value(json!({
                "type": "ValidatedCreateUsernameCallback",
                "output": [{"name": "prompt", "value": "Username"}],
                "input": [{"name": "IDToken1", "value": ""}]
            }))
            .unwrap(),
        )
        .unwrap();

        assert!(callback.failed_policies().unwrap().is_empty());
        assert!(callback.clone().set_validate_only(true).is_err());
    }
}
