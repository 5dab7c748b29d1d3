//! Integration tests for a self-service registration Node
//!
//! Covers a realistic multi-callback page: parsing, filling every collector
//! and producing the submission body.

use authtree_domain::callback::validated::PolicyValidated;
use authtree_domain::callback::{
    BooleanAttributeInputCallback, Callback, ChoiceCallback, KbaCreateCallback,
    StringAttributeInputCallback, TermsAndConditionsCallback, ValidatedCreatePasswordCallback,
    ValidatedCreateUsernameCallback,
};
use authtree_domain::{AuthError, CallbackError, CallbackRegistry, Node};
use serde_json::{json, Value};

// ============================================================================
// Fixtures
// ============================================================================

fn registration_page() -> Value {
    json!({
        "authId": "registration-auth-id",
        "header": "Sign Up",
        "callbacks": [
            {
                "type": "ValidatedCreateUsernameCallback",
                "output": [
                    {"name": "policies", "value": {}},
                    {"name": "failedPolicies", "value": []},
                    {"name": "validateOnly", "value": false},
                    {"name": "prompt", "value": "Username"}
                ],
                "input": [
                    {"name": "IDToken1", "value": ""},
                    {"name": "IDToken1validateOnly", "value": false}
                ],
                "_id": 0
            },
            {
                "type": "StringAttributeInputCallback",
                "output": [
                    {"name": "name", "value": "givenName"},
                    {"name": "prompt", "value": "First Name"},
                    {"name": "required", "value": true},
                    {"name": "policies", "value": {}},
                    {"name": "failedPolicies", "value": []},
                    {"name": "validateOnly", "value": false},
                    {"name": "value", "value": ""}
                ],
                "input": [
                    {"name": "IDToken2", "value": ""},
                    {"name": "IDToken2validateOnly", "value": false}
                ],
                "_id": 1
            },
            {
                "type": "BooleanAttributeInputCallback",
                "output": [
                    {"name": "name", "value": "preferences/marketing"},
                    {"name": "prompt", "value": "Send me special offers"},
                    {"name": "required", "value": false},
                    {"name": "value", "value": false}
                ],
                "input": [
                    {"name": "IDToken3", "value": false}
                ],
                "_id": 2
            },
            {
                "type": "ValidatedCreatePasswordCallback",
                "output": [
                    {"name": "echoOn", "value": false},
                    {"name": "policies", "value": {}},
                    {"name": "failedPolicies", "value": []},
                    {"name": "validateOnly", "value": false},
                    {"name": "prompt", "value": "Password"}
                ],
                "input": [
                    {"name": "IDToken4", "value": ""},
                    {"name": "IDToken4validateOnly", "value": false}
                ],
                "_id": 3
            },
            {
                "type": "KbaCreateCallback",
                "output": [
                    {"name": "prompt", "value": "Select a security question"},
                    {"name": "predefinedQuestions", "value": [
                        "What's your favorite color?",
                        "Who was your first employer?"
                    ]},
                    {"name": "allowUserDefinedQuestions", "value": false}
                ],
                "input": [
                    {"name": "IDToken5question", "value": ""},
                    {"name": "IDToken5answer", "value": ""}
                ],
                "_id": 4
            },
            {
                "type": "ChoiceCallback",
                "output": [
                    {"name": "prompt", "value": "Region"},
                    {"name": "choices", "value": ["EU", "US"]},
                    {"name": "defaultChoice", "value": 0}
                ],
                "input": [
                    {"name": "IDToken6", "value": 0}
                ],
                "_id": 5
            },
            {
                "type": "TermsAndConditionsCallback",
                "output": [
                    {"name": "version", "value": "0.0"},
                    {"name": "terms", "value": "Terms and conditions text"},
                    {"name": "createDate", "value": "2019-10-28T04:20:11.320Z"}
                ],
                "input": [
                    {"name": "IDToken7", "value": false}
                ],
                "_id": 6
            }
        ]
    })
}

fn parse(value: &Value) -> Node {
    Node::from_json(value, &CallbackRegistry::with_defaults()).expect("registration page parses")
}

fn input(body: &Value, callback: usize, slot: usize) -> Value {
    body["callbacks"][callback]["input"][slot]["value"].clone()
}

// ============================================================================
// Filling the page
// ============================================================================

/// Validates filling every collector on a registration page.
///
/// Assertions:
/// - Ensures each typed accessor writes its own input slot.
/// - Ensures the header and callback order survive serialization.
#[test]
fn test_fill_registration_page() {
    let mut node = parse(&registration_page());

    node.callback_mut::<ValidatedCreateUsernameCallback>().unwrap().set_username("sdkuser");
    node.callback_mut::<StringAttributeInputCallback>().unwrap().set_value("Ada");
    node.callback_mut::<BooleanAttributeInputCallback>().unwrap().set_value(true);
    node.callback_mut::<ValidatedCreatePasswordCallback>().unwrap().set_password("Passw0rd!");
    let kba = node.callback_mut::<KbaCreateCallback>().unwrap();
    kba.set_question("Who was your first employer?").unwrap();
    kba.set_answer("ForgeRock").unwrap();
    node.callback_mut::<ChoiceCallback>().unwrap().select("US").unwrap();
    node.callback_mut::<TermsAndConditionsCallback>().unwrap().set_accepted(true);

    let body = node.to_json();

    assert_eq!(body["header"], "Sign Up");
    assert_eq!(input(&body, 0, 0), "sdkuser");
    assert_eq!(input(&body, 1, 0), "Ada");
    assert_eq!(input(&body, 2, 0), true);
    assert_eq!(input(&body, 3, 0), "Passw0rd!");
    assert_eq!(input(&body, 4, 0), "Who was your first employer?");
    assert_eq!(input(&body, 4, 1), "ForgeRock");
    assert_eq!(input(&body, 5, 0), 1);
    assert_eq!(input(&body, 6, 0), true);
}

/// Validates the validate-only round used for live policy feedback.
///
/// Assertions:
/// - Ensures only the callbacks that were asked write their flag slot.
#[test]
fn test_validate_only_round() {
    let mut node = parse(&registration_page());

    let username = node.callback_mut::<ValidatedCreateUsernameCallback>().unwrap();
    username.set_validate_only(true).unwrap();

    let body = node.to_json();
    assert_eq!(input(&body, 0, 1), true);
    assert_eq!(input(&body, 3, 1), false);
}

/// Validates that a question outside the predefined list is refused when
/// custom questions are disabled.
///
/// Assertions:
/// - Ensures the error names the callback and the slot stays empty.
#[test]
fn test_custom_question_rejected() {
    let mut node = parse(&registration_page());

    let result = node.callback_mut::<KbaCreateCallback>().unwrap().set_question("My own question");

    assert!(matches!(result, Err(CallbackError::InvalidInput { .. })));
    assert_eq!(input(&node.to_json(), 4, 0), "");
}

/// Validates that the server's policy failures on a resubmitted page are
/// readable.
///
/// Assertions:
/// - Ensures failures are attached to the right collector.
/// - Ensures the human readable text mentions the parameter.
#[test]
fn test_policy_failures_after_resubmit() {
    let mut page = registration_page();
    page["callbacks"][0]["output"][1]["value"] = json!([
        "{ \"policyRequirement\": \"VALID_USERNAME\" }",
        { "params": { "minLength": 6 }, "policyRequirement": "MIN_LENGTH" }
    ]);
    let node = parse(&page);

    let username = node.callback::<ValidatedCreateUsernameCallback>().unwrap();
    let failures = username.failed_policies().unwrap();

    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].policy_requirement, "VALID_USERNAME");
    assert!(failures[1].describe("Username").contains('6'));
    let password = node.callback::<ValidatedCreatePasswordCallback>().unwrap();
    assert!(password.failed_policies().unwrap().is_empty());
}

/// Validates that a registry without a type rejects the whole page.
///
/// Assertions:
/// - Ensures the unsupported type is reported by name.
#[test]
fn test_page_with_unregistered_type_fails() {
    let mut registry = CallbackRegistry::with_defaults();
    registry.unregister("TermsAndConditionsCallback");

    let err = Node::from_json(&registration_page(), &registry).unwrap_err();

    assert_eq!(
        err,
        AuthError::UnsupportedCallback { callback_type: "TermsAndConditionsCallback".into() }
    );
}

#[test]
fn test_indexes_follow_page_order() {
    let node = parse(&registration_page());

    let indexes: Vec<usize> = node.callbacks().iter().map(|c| c.index()).collect();

    assert_eq!(indexes, (0..7).collect::<Vec<_>>());
}
