//! Step-up policy advice returned by protected resources.

use crate::errors::{AuthError, Result};

/// A single advice (`AuthenticateToServiceConditionAdvice`,
/// `TransactionConditionAdvice`, ...) used to start a tree with
/// `authIndexType=composite_advice`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyAdvice {
    pub advice_type: String,
    pub value: String,
}

impl PolicyAdvice {
    pub fn new(advice_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self { advice_type: advice_type.into(), value: value.into() }
    }

    /// XML form sent as `authIndexValue`.
    pub fn to_xml(&self) -> String {
        format!(
            "<Advices><AttributeValuePair><Attribute name=\"{}\"/><Value>{}</Value>\
             </AttributeValuePair></Advices>",
            escape(&self.advice_type),
            escape(&self.value)
        )
    }

    /// Parse the first `AttributeValuePair` of an advice document.
    pub fn parse_xml(xml: &str) -> Result<Self> {
        let missing = || AuthError::parse(format!("advice not found: {xml}"));
        let pair_start = xml.find("<AttributeValuePair>").ok_or_else(missing)?;
        let pair = &xml[pair_start..];

        let name_start = pair.find("name=\"").ok_or_else(missing)? + "name=\"".len();
        let name_len = pair[name_start..].find('"').ok_or_else(missing)?;
        let value_start = pair.find("<Value>").ok_or_else(missing)? + "<Value>".len();
        let value_len = pair[value_start..].find("</Value>").ok_or_else(missing)?;

        Ok(Self::new(
            unescape(&pair[name_start..name_start + name_len]),
            unescape(&pair[value_start..value_start + value_len]),
        ))
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

fn unescape(text: &str) -> String {
    text.replace("&quot;", "\"").replace("&gt;", ">").replace("&lt;", "<").replace("&amp;", "&")
}
