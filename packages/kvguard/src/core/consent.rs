//! Operator consent as an injected decision policy.
//!
//! Every destructive or elevating step (role grants, clearing a non-empty
//! backup directory) asks through this trait instead of reading the
//! console, so the core runs unattended and under test.

/// Decision policy for yes/no confirmations.
pub trait Consent {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Approves every confirmation. Used for `--auto-approve` runs.
pub struct AutoApprove;

impl Consent for AutoApprove {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Declines every confirmation.
pub struct DenyAll;

impl Consent for DenyAll {
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}

/// Answers confirmations from a pre-supplied script, recording every
/// prompt it was asked. Falls back to declining when the script runs out.
pub struct ScriptedConsent {
    answers: std::sync::Mutex<std::collections::VecDeque<bool>>,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl ScriptedConsent {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        ScriptedConsent {
            answers: std::sync::Mutex::new(answers.into_iter().collect()),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Prompts asked so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

impl Consent for ScriptedConsent {
    fn confirm(&self, prompt: &str) -> bool {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .unwrap_or(false)
    }
}
