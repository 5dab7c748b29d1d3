//! Registration-time agreement and recovery question callbacks.

use serde_json::Value;

use crate::callback::{CallbackError, RawCallback};
use crate::impl_callback;

/// Create a knowledge-based authentication question and answer.
#[derive(Debug, Clone, PartialEq)]
pub struct KbaCreateCallback {
    raw: RawCallback,
}

impl_callback!(KbaCreateCallback, "KbaCreateCallback", |raw| {
    if !raw.has_input_suffix("question") || !raw.has_input_suffix("answer") {
        return Err(raw.malformed("expected question and answer input slots"));
    }
    Ok(KbaCreateCallback { raw })
});

impl KbaCreateCallback {
    pub fn prompt(&self) -> Option<&str> {
        self.raw.output_str("prompt")
    }

    pub fn predefined_questions(&self) -> Vec<String> {
        self.raw.output_strings("predefinedQuestions")
    }

    pub fn allow_user_defined_questions(&self) -> bool {
        self.raw.output_bool("allowUserDefinedQuestions").unwrap_or(true)
    }

    pub fn set_question(&mut self, question: impl Into<String>) -> Result<(), CallbackError> {
        let question = question.into();
        let predefined = self.predefined_questions().contains(&question);
        if !self.allow_user_defined_questions() && !predefined {
            return Err(self.raw.invalid_input("custom questions are not allowed"));
        }
        self.raw.set_input_by_suffix("question", question)
    }

    pub fn set_answer(&mut self, answer: impl Into<String>) -> Result<(), CallbackError> {
        self.raw.set_input_by_suffix("answer", answer.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TermsAndConditionsCallback {
    raw: RawCallback,
}

impl_callback!(TermsAndConditionsCallback, "TermsAndConditionsCallback", |raw| {
    raw.require_inputs(1)?;
    Ok(TermsAndConditionsCallback { raw })
});

impl TermsAndConditionsCallback {
    pub fn version(&self) -> Option<&str> {
        self.raw.output_str("version")
    }

    pub fn terms(&self) -> Option<&str> {
        self.raw.output_str("terms")
    }

    pub fn create_date(&self) -> Option<&str> {
        self.raw.output_str("createDate")
    }

    pub fn set_accepted(&mut self, accepted: bool) {
        let _ = self.raw.set_input(0, accepted);
    }
}

/// Consent to share a mapped set of profile fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsentMappingCallback {
    raw: RawCallback,
}

impl_callback!(ConsentMappingCallback, "ConsentMappingCallback", |raw| {
    raw.require_inputs(1)?;
    Ok(ConsentMappingCallback { raw })
});

impl ConsentMappingCallback {
    pub fn name(&self) -> Option<&str> {
        self.raw.output_str("name")
    }

    pub fn display_name(&self) -> Option<&str> {
        self.raw.output_str("displayName")
    }

    pub fn icon(&self) -> Option<&str> {
        self.raw.output_str("icon")
    }

    pub fn access_level(&self) -> Option<&str> {
        self.raw.output_str("accessLevel")
    }

    pub fn is_required(&self) -> bool {
        self.raw.output_bool("isRequired").unwrap_or(false)
    }

    pub fn message(&self) -> Option<&str> {
        self.raw.output_str("message")
    }

    pub fn fields(&self) -> Vec<String> {
        self.raw.output_strings("fields")
    }

    pub fn accepted(&self) -> bool {
        self.raw.input_value(0).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn set_accepted(&mut self, accepted: bool) {
        let _ = self.raw.set_input(0, accepted);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::callback::{Callback, CallbackVariant};

    fn kba(allow_custom: bool) -> KbaCreateCallback {
        KbaCreateCallback::from_raw(
            serde_json::from_value(json!({
                "type": "KbaCreateCallback",
                "output": [
                    {"name": "prompt", "value": "Select a security question"},
                    {"name": "predefinedQuestions", "value": ["What's your favorite color?"]},
                    {"name": "allowUserDefinedQuestions", "value": allow_custom}
                ],
                "input": [
                    {"name": "IDToken1question", "value": ""},
                    {"name": "IDToken1answer", "value": ""}
                ]
            }))
            .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn kba_fills_question_and_answer() {
        let mut callback = kba(false);

        callback.set_question("What's your favorite color?").unwrap();
        callback.set_answer("blue").unwrap();

        assert_eq!(callback.raw().input_value(0), Some(&json!("What's your favorite color?")));
        assert_eq!(callback.raw().input_value(1), Some(&json!("blue")));
    }

    #[test]
    fn kba_rejects_custom_question_when_disallowed() {
        assert!(kba(false).set_question("Pet name?").is_err());
        assert!(kba(true).set_question("Pet name?").is_ok());
    }

    #[test]
    fn terms_and_consent_accept() {
        let mut terms = TermsAndConditionsCallback::from_raw(
            serde_json::from_value(json!({
                "type": "TermsAndConditionsCallback",
                "output": [
                    {"name": "version", "value": "0.0"},
                    {"name": "terms", "value": "Be nice"}
                ],
                "input": [{"name": "IDToken1", "value": false}]
            }))
            .unwrap(),
        )
        .unwrap();
        terms.set_accepted(true);

        let mut consent = ConsentMappingCallback::from_raw(
            serde_json::from_value(json!({
                "type": "ConsentMappingCallback",
                "output": [
                    {"name": "name", "value": "managedUser_app"},
                    {"name": "fields", "value": ["email"]}
                ],
                "input": [{"name": "IDToken1", "value": false}]
            }))
            .unwrap(),
        )
        .unwrap();
        consent.set_accepted(true);

        assert_eq!(terms.version(), Some("0.0"));
        assert_eq!(terms.raw().input_value(0), Some(&json!(true)));
        assert!(consent.accepted());
        assert_eq!(consent.fields(), vec!["email"]);
    }
}
