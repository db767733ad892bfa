use ragguard_core::traits::LanguageModel;

/// Offline stand-in model that returns its prompt verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoModel;

pub const ECHO_PREFIX: &str = "[ECHO MODEL] ";

impl LanguageModel for EchoModel {
    fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        Ok(format!("{ECHO_PREFIX}{prompt}"))
    }
}
