//! Interactive prompts for values not supplied as flags.

use crate::core::consent::Consent;
use crate::error::{KvError, KvResult};
use dialoguer::{Confirm, Input, theme::ColorfulTheme};

/// Console-backed consent; a failed prompt counts as a decline.
pub struct InteractiveConsent;

impl Consent for InteractiveConsent {
    fn confirm(&self, prompt: &str) -> bool {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

/// Prompt for a required text value.
pub fn prompt_text(prompt: &str) -> KvResult<String> {
    Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text()
        .map_err(|e| KvError::InvalidInput(format!("failed to read input: {e}")))
}

/// Prompt for a text value with a pre-filled default.
pub fn prompt_text_with_default(prompt: &str, default: &str) -> KvResult<String> {
    Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default.to_string())
        .interact_text()
        .map_err(|e| KvError::InvalidInput(format!("failed to read input: {e}")))
}
