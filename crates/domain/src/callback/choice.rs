//! Selection callbacks.

use crate::callback::{CallbackError, RawCallback};
use crate::impl_callback;

/// Pick one of a list of choices by index.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceCallback {
    raw: RawCallback,
}

impl_callback!(ChoiceCallback, "ChoiceCallback", |raw| {
    raw.require_inputs(1)?;
    raw.require_output("choices")?;
    Ok(ChoiceCallback { raw })
});

impl ChoiceCallback {
    pub fn prompt(&self) -> Option<&str> {
        self.raw.output_str("prompt")
    }

    pub fn choices(&self) -> Vec<String> {
        self.raw.output_strings("choices")
    }

    pub fn default_choice(&self) -> Option<usize> {
        self.raw.output_i64("defaultChoice").and_then(|i| usize::try_from(i).ok())
    }

    pub fn set_selected_index(&mut self, index: usize) -> Result<(), CallbackError> {
        select(&mut self.raw, "choices", index)
    }

    /// Select the choice whose label equals `choice`.
    pub fn select(&mut self, choice: &str) -> Result<(), CallbackError> {
        let index = self
            .choices()
            .iter()
            .position(|c| c == choice)
            .ok_or_else(|| self.raw.invalid_input(format!("unknown choice `{choice}`")))?;
        self.set_selected_index(index)
    }
}

/// Confirmation prompt with a list of options (e.g. "Yes" / "No").
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationCallback {
    raw: RawCallback,
}

impl_callback!(ConfirmationCallback, "ConfirmationCallback", |raw| {
    raw.require_inputs(1)?;
    raw.require_output("options")?;
    Ok(ConfirmationCallback { raw })
});

impl ConfirmationCallback {
    pub fn prompt(&self) -> Option<&str> {
        self.raw.output_str("prompt")
    }

    pub fn message_type(&self) -> Option<i64> {
        self.raw.output_i64("messageType")
    }

    pub fn options(&self) -> Vec<String> {
        self.raw.output_strings("options")
    }

    pub fn option_type(&self) -> Option<i64> {
        self.raw.output_i64("optionType")
    }

    pub fn default_option(&self) -> Option<usize> {
        self.raw.output_i64("defaultOption").and_then(|i| usize::try_from(i).ok())
    }

    pub fn set_selected_index(&mut self, index: usize) -> Result<(), CallbackError> {
        select(&mut self.raw, "options", index)
    }

    pub fn select_option(&mut self, option: &str) -> Result<(), CallbackError> {
        let index = self
            .options()
            .iter()
            .position(|o| o == option)
            .ok_or_else(|| self.raw.invalid_input(format!("unknown option `{option}`")))?;
        self.set_selected_index(index)
    }
}

fn select(raw: &mut RawCallback, list: &str, index: usize) -> Result<(), CallbackError> {
    let len = raw.output_strings(list).len();
    if index >= len {
        return Err(raw.invalid_input(format!("index {index} out of range for {len} {list}")));
    }
    raw.set_input(0, index)
}
