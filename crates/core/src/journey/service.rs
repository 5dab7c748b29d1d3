//! Authentication tree engine - one `/authenticate` round trip per call

use std::sync::Arc;

use authtree_domain::constants::{
    ACCEPT_API_VERSION, AUTHENTICATE_API_VERSION, AUTH_INDEX_COMPOSITE_ADVICE, AUTH_INDEX_SERVICE,
    AUTH_INDEX_TYPE, AUTH_INDEX_VALUE, SESSION_TIMEOUT_ERROR_CODE, SUSPENDED_ID,
    SUSPENDED_SESSION_MARKER,
};
use authtree_domain::{AuthError, NextStep, Node, PolicyAdvice, Result, SsoToken};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::context::AuthContext;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

const TOKEN_ID: &str = "tokenId";

/// Drives the server-defined tree.
///
/// The engine keeps no per-walk state: the Node returned to the caller
/// carries everything needed for the next submission.
pub struct AuthTreeEngine {
    context: Arc<AuthContext>,
    transport: Arc<dyn HttpTransport>,
}

impl AuthTreeEngine {
    pub fn new(context: Arc<AuthContext>, transport: Arc<dyn HttpTransport>) -> Self {
        Self { context, transport }
    }

    pub fn context(&self) -> &Arc<AuthContext> {
        &self.context
    }

    /// Initiate the tree named `tree`.
    pub async fn start(&self, tree: &str) -> Result<NextStep> {
        if tree.trim().is_empty() {
            return Err(AuthError::config("tree name must not be empty"));
        }
        info!(tree, "starting authentication tree");
        self.initiate(vec![
            (AUTH_INDEX_TYPE.to_string(), AUTH_INDEX_SERVICE.to_string()),
            (AUTH_INDEX_VALUE.to_string(), tree.to_string()),
        ])
        .await
    }

    /// Initiate the configured default tree.
    pub async fn start_default(&self) -> Result<NextStep> {
        let tree = self
            .context
            .config
            .tree
            .clone()
            .ok_or_else(|| AuthError::config("no default tree configured"))?;
        self.start(&tree).await
    }

    /// Initiate a step-up tree from policy advice.
    pub async fn start_with_advice(&self, advice: &PolicyAdvice) -> Result<NextStep> {
        info!(advice_type = %advice.advice_type, "starting tree from policy advice");
        self.initiate(vec![
            (AUTH_INDEX_TYPE.to_string(), AUTH_INDEX_COMPOSITE_ADVICE.to_string()),
            (AUTH_INDEX_VALUE.to_string(), advice.to_xml()),
        ])
        .await
    }

    /// Resume a suspended tree from the link the user received.
    ///
    /// Every query parameter of `resume_uri` is forwarded; `suspendedId` is
    /// required.
    pub async fn resume(&self, resume_uri: &Url) -> Result<NextStep> {
        let params: Vec<(String, String)> =
            resume_uri.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
        if !params.iter().any(|(key, value)| key == SUSPENDED_ID && !value.is_empty()) {
            return Err(AuthError::illegal_state(format!("resume uri has no {SUSPENDED_ID}")));
        }
        info!("resuming suspended authentication tree");
        self.initiate(params).await
    }

    /// Submit a filled-in Node.
    pub async fn next(&self, node: &Node) -> Result<NextStep> {
        debug!(stage = ?node.stage, callbacks = node.callbacks().len(), "submitting node");
        let url = self.context.config.server.authenticate_url()?;
        self.post(url, node.to_json()).await
    }

    async fn initiate(&self, params: Vec<(String, String)>) -> Result<NextStep> {
        let mut url = self.context.config.server.authenticate_url()?;
        url.query_pairs_mut().extend_pairs(params);
        self.post(url, json!({})).await
    }

    async fn post(&self, url: Url, body: Value) -> Result<NextStep> {
        let request = HttpRequest::post(url)
            .header(ACCEPT_API_VERSION, AUTHENTICATE_API_VERSION)
            .json(body);
        let response = self.transport.execute(request).await?;
        self.classify(&response)
    }

    /// Map an `/authenticate` response onto the next step or a typed error.
    fn classify(&self, response: &HttpResponse) -> Result<NextStep> {
        if response.is_success() {
            let body = response.json()?;
            if let Some(token_id) = body.get(TOKEN_ID).and_then(Value::as_str) {
                info!("authentication tree completed");
                let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_owned);
                return Ok(NextStep::Success(SsoToken {
                    value: token_id.to_string(),
                    success_url: text("successUrl"),
                    realm: text("realm"),
                }));
            }
            let node = Node::from_json(&body, &self.context.registry)?;
            debug!(stage = ?node.stage, callbacks = node.callbacks().len(), "received node");
            return Ok(NextStep::Continue(node));
        }

        let error = response.api_error();
        if response.status == 401 {
            let failure = classify_unauthorized(&error.body);
            warn!(status = response.status, kind = failure.kind(), "tree submission rejected");
            return Err(failure.into_error(error));
        }
        warn!(status = response.status, "authenticate endpoint returned an error");
        Err(AuthError::Api(error))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unauthorized {
    Timeout,
    Suspended,
    Rejected,
}

impl Unauthorized {
    fn kind(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Suspended => "suspended",
            Self::Rejected => "rejected",
        }
    }

    fn into_error(self, error: authtree_domain::ApiError) -> AuthError {
        match self {
            Self::Timeout => AuthError::AuthenticationTimeout(error),
            Self::Suspended => AuthError::SuspendedAuthSession(error),
            Self::Rejected => AuthError::Authentication(error),
        }
    }
}

fn classify_unauthorized(body: &str) -> Unauthorized {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return Unauthorized::Rejected;
    };
    if let Some(detail) = json.get("detail").and_then(Value::as_object) {
        let code = match detail.get("errorCode") {
            Some(Value::String(code)) => code.clone(),
            Some(Value::Number(code)) => code.to_string(),
            _ => String::new(),
        };
        return if code == SESSION_TIMEOUT_ERROR_CODE {
            Unauthorized::Timeout
        } else {
            Unauthorized::Rejected
        };
    }
    let message = json.get("message").and_then(Value::as_str).unwrap_or_default();
    if message.contains(SUSPENDED_SESSION_MARKER) {
        Unauthorized::Suspended
    } else {
        Unauthorized::Rejected
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for journey::service.
    use authtree_common::testing::{node_json, success_json};
    use authtree_common::time::MockClock;
    use authtree_domain::callback::{NameCallback, PasswordCallback};
    use authtree_domain::{ApiError, Recovery};

    use super::*;
    use crate::test_support::{context, ScriptedTransport};
    use crate::transport::{Method, RequestBody};

    fn engine(transport: &Arc<ScriptedTransport>) -> AuthTreeEngine {
        AuthTreeEngine::new(context(&MockClock::new()), transport.clone())
    }

    fn ok(body: Value) -> HttpResponse {
        HttpResponse::new(200, body.to_string())
    }

    fn continued(step: NextStep) -> Node {
        match step {
            NextStep::Continue(node) => node,
            NextStep::Success(_) => panic!("expected a node"),
        }
    }

    /// Validates the username/password walk end to end.
    ///
    /// Assertions:
    /// - Ensures initiation targets the tree by `authIndexType=service`.
    /// - Ensures the submitted body echoes `authId` and the filled inputs.
    /// - Ensures the final response yields the SSO token.
    #[tokio::test]
    async fn test_walk_name_then_password_then_success() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .on(
                Method::Post,
                "/authenticate",
                ok(node_json("auth-1", &[("NameCallback", "User Name", "IDToken1")])),
            )
            .on(
                Method::Post,
                "/authenticate",
                ok(node_json("auth-2", &[("PasswordCallback", "Password", "IDToken1")])),
            )
            .on(Method::Post, "/authenticate", ok(success_json("sso-token")));
        let engine = engine(&transport);

        let mut node = continued(engine.start("Login").await.unwrap());
        node.callback_mut::<NameCallback>().unwrap().set_name("tester");
        let mut node = continued(engine.next(&node).await.unwrap());
        node.callback_mut::<PasswordCallback>().unwrap().set_password("password");
        let step = engine.next(&node).await.unwrap();

        let NextStep::Success(token) = step else { panic!("expected success") };
        assert_eq!(token.value, "sso-token");
        assert_eq!(token.success_url.as_deref(), Some("/console"));

        let requests = transport.requests();
        assert_eq!(requests[0].url.path(), "/am/json/realms/root/authenticate");
        assert_eq!(requests[0].url.query(), Some("authIndexType=service&authIndexValue=Login"));
        assert_eq!(
            requests[0].header_value("Accept-API-Version"),
            Some("resource=2.1, protocol=1.0")
        );
        let Some(RequestBody::Json(body)) = &requests[1].body else { panic!("json body") };
        assert_eq!(body["authId"], "auth-1");
        assert_eq!(body["callbacks"][0]["input"][0]["value"], "tester");
        assert_eq!(requests[1].url.query(), None);
    }

    /// Validates 401 classification.
    ///
    /// Assertions:
    /// - Ensures `detail.errorCode == "110"` is a timeout.
    /// - Ensures the suspended marker maps to a suspended session.
    /// - Ensures any other 401 keeps status and raw body.
    #[tokio::test]
    async fn test_unauthorized_classification() {
        let timeout = concat!(
            r#"{"code":401,"reason":"Unauthorized","message":"Session has timed out","#,
            r#""detail":{"errorCode":"110"}}"#
        );
        let suspended = concat!(
            r#"{"code":401,"message":"org.forgerock.openam.auth.nodes.framework.token."#,
            r#"SuspendedAuthSessionException: expired"}"#
        );
        let rejected = r#"{"code":401,"reason":"Unauthorized","message":"Login failure"}"#;
        let node = Node::new("auth", Vec::new());

        for (body, expected) in [
            (timeout, AuthError::AuthenticationTimeout(ApiError::new(401, timeout))),
            (suspended, AuthError::SuspendedAuthSession(ApiError::new(401, suspended))),
            (rejected, AuthError::Authentication(ApiError::new(401, rejected))),
        ] {
            let transport = Arc::new(ScriptedTransport::new());
            transport.on(Method::Post, "/authenticate", HttpResponse::new(401, body));

            let err = engine(&transport).next(&node).await.unwrap_err();

            assert_eq!(err, expected);
        }
    }

    /// Validates non-401 failures and recovery hints.
    ///
    /// Assertions:
    /// - Ensures a 500 is an `Api` error with the body verbatim.
    /// - Ensures a rejected login asks to resubmit the node.
    #[tokio::test]
    async fn test_other_errors_are_api_errors() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.on(Method::Post, "/authenticate", HttpResponse::new(500, "boom"));

        let err = engine(&transport).start("Login").await.unwrap_err();

        assert_eq!(err, AuthError::Api(ApiError::new(500, "boom")));
        let rejected = AuthError::Authentication(ApiError::new(401, ""));
        assert_eq!(rejected.recovery(), Recovery::ResubmitNode);
    }

    #[tokio::test]
    async fn test_unknown_callback_is_unsupported() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.on(
            Method::Post,
            "/authenticate",
            ok(node_json("a", &[("WebAuthnRegistrationCallback", "", "IDToken1")])),
        );

        let err = engine(&transport).start("Login").await.unwrap_err();

        assert_eq!(
            err,
            AuthError::UnsupportedCallback { callback_type: "WebAuthnRegistrationCallback".into() }
        );
        assert_eq!(err.recovery(), Recovery::RestartTree);
    }

    /// Validates advice and resume initiation.
    ///
    /// Assertions:
    /// - Ensures advice is sent as `composite_advice` with the XML value.
    /// - Ensures resume forwards `suspendedId`.
    /// - Ensures a resume link without `suspendedId` is an illegal state.
    #[tokio::test]
    async fn test_advice_and_resume_initiation() {
        let transport = Arc::new(ScriptedTransport::new());
        let node = node_json("a", &[("NameCallback", "User", "IDToken1")]);
        transport.on(Method::Post, "/authenticate", ok(node));
        let engine = engine(&transport);

        let advice = PolicyAdvice::new("AuthenticateToServiceConditionAdvice", "/:Example");
        engine.start_with_advice(&advice).await.unwrap();
        let resume =
            Url::parse("https://app.example.com/resume?suspendedId=abc123&realm=/").unwrap();
        engine.resume(&resume).await.unwrap();
        let missing = Url::parse("https://app.example.com/resume").unwrap();
        let err = engine.resume(&missing).await.unwrap_err();

        let requests = transport.requests();
        let advice_query: Vec<(String, String)> =
            requests[0].url.query_pairs().into_owned().collect();
        assert_eq!(advice_query[0], ("authIndexType".into(), "composite_advice".into()));
        assert!(advice_query[1].1.starts_with("<Advices><AttributeValuePair>"));
        assert!(requests[1].url.query_pairs().any(|(k, v)| k == "suspendedId" && v == "abc123"));
        assert!(matches!(err, AuthError::IllegalState(_)));
        assert_eq!(requests.len(), 2);
    }

    #[tokio::test]
    async fn test_start_default_uses_configured_tree() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.on(Method::Post, "/authenticate", ok(success_json("t")));

        engine(&transport).start_default().await.unwrap();

        assert!(transport.requests()[0].url.query().unwrap().contains("authIndexValue=Login"));
    }
}
