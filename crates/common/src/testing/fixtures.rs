//! Canned server payloads shaped like real `/authenticate` and
//! `/access_token` responses.

use serde_json::{json, Value};

/// `/access_token` response body.
pub fn token_response_json(access_token: &str, expires_in: i64) -> Value {
    json!({
        "access_token": access_token,
        "refresh_token": format!("{access_token}-refresh"),
        "id_token": "eyJ0eXAiOiJKV1QiLCJhbGciOiJSUzI1NiJ9.eyJzdWIiOiJ0ZXN0ZXIifQ.sig",
        "scope": "openid email address",
        "token_type": "Bearer",
        "expires_in": expires_in,
    })
}

/// A node carrying the given `(type, prompt, input name)` callbacks.
pub fn node_json(auth_id: &str, callbacks: &[(&str, &str, &str)]) -> Value {
    let callbacks: Vec<Value> = callbacks
        .iter()
        .enumerate()
        .map(|(id, (callback_type, prompt, input))| {
            json!({
                "type": callback_type,
                "output": [{"name": "prompt", "value": prompt}],
                "input": [{"name": input, "value": ""}],
                "_id": id,
            })
        })
        .collect();
    json!({ "authId": auth_id, "callbacks": callbacks })
}

/// Terminal success body.
pub fn success_json(token_id: &str) -> Value {
    json!({ "tokenId": token_id, "successUrl": "/console", "realm": "/" })
}
