//! Output-only callbacks. They carry nothing back to the server but are
//! still echoed in the submitted Node.

use std::time::Duration;

use serde_json::Value;

use crate::callback::RawCallback;
use crate::impl_callback;

/// Severity of a text output message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Information,
    Warning,
    Error,
    /// The message is a script for the client to run.
    Script,
    Unknown(i64),
}

impl From<i64> for MessageType {
    fn from(value: i64) -> Self {
        match value {
            0 => Self::Information,
            1 => Self::Warning,
            2 => Self::Error,
            4 => Self::Script,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextOutputCallback {
    raw: RawCallback,
}

impl_callback!(TextOutputCallback, "TextOutputCallback", |raw| {
    raw.require_output("message")?;
    Ok(TextOutputCallback { raw })
});

impl TextOutputCallback {
    pub fn message(&self) -> &str {
        self.raw.output_str("message").unwrap_or_default()
    }

    pub fn message_type(&self) -> MessageType {
        MessageType::from(self.raw.output_i64("messageType").unwrap_or(0))
    }
}

/// Shown when the tree suspends itself (e.g. "check your email").
#[derive(Debug, Clone, PartialEq)]
pub struct SuspendedTextOutputCallback {
    raw: RawCallback,
}

impl_callback!(SuspendedTextOutputCallback, "SuspendedTextOutputCallback", |raw| {
    raw.require_output("message")?;
    Ok(SuspendedTextOutputCallback { raw })
});

impl SuspendedTextOutputCallback {
    pub fn message(&self) -> &str {
        self.raw.output_str("message").unwrap_or_default()
    }

    pub fn message_type(&self) -> MessageType {
        MessageType::from(self.raw.output_i64("messageType").unwrap_or(0))
    }
}

/// Arbitrary server data, commonly `{"stage": "..."}`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataCallback {
    raw: RawCallback,
}

impl_callback!(MetadataCallback, "MetadataCallback", |raw| {
    raw.require_output("data")?;
    Ok(MetadataCallback { raw })
});

impl MetadataCallback {
    pub fn data(&self) -> &Value {
        self.raw.output("data").unwrap_or(&Value::Null)
    }

    pub fn stage(&self) -> Option<&str> {
        self.data().get("stage").and_then(Value::as_str)
    }
}

/// Asks the client to wait, then resubmit the Node unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct PollingWaitCallback {
    raw: RawCallback,
}

impl_callback!(PollingWaitCallback, "PollingWaitCallback", |raw| {
    raw.require_output("waitTime")?;
    Ok(PollingWaitCallback { raw })
});

impl PollingWaitCallback {
    pub fn wait_time(&self) -> Duration {
        let millis = self.raw.output_i64("waitTime").unwrap_or(0);
        Duration::from_millis(u64::try_from(millis).unwrap_or(0))
    }

    pub fn message(&self) -> Option<&str> {
        self.raw.output_str("message")
    }
}
