//! Domain-restriction prompt

/// The fixed instruction that keeps the model on one topic domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPrompt {
    label: String,
    instruction: String,
}

impl DomainPrompt {
    /// Build the standard instruction for `label`
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let instruction = format!(
            "You are an AI assistant that specializes exclusively in {label}.\n\
             Do not answer questions that are not related to {label}.\n\
             If someone asks an unrelated question, politely explain that you can only help with topics related to {label}."
        );
        Self { label, instruction }
    }

    /// Human-readable domain label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The system instruction text
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Single-turn prompt for the provider.
    ///
    /// The instruction is prepended on every call since the provider keeps
    /// no state between calls.
    pub fn build_prompt(&self, user_text: &str) -> String {
        format!("{}\n\nUser: {}\nAssistant:", self.instruction, user_text)
    }
}
