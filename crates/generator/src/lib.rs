//! The external text generator contract: opaque text-in/text-out with
//! cancellation. Grounded in the teacher's `LlmProvider` trait shape
//! (`crates/providers/src/traits.rs`), narrowed to the single operation this
//! spec needs, plus the default echo implementation from
//! `original_source/backend/internal/agent/client.go`.

use async_trait::async_trait;
use concierge_domain::Result;
use tokio_util::sync::CancellationToken;

/// `generate(cancellationToken, modelName, prompt) -> string`. Cancellation
/// must be honored at network boundaries; failures are opaque — the core
/// does not interpret them.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, cancellation: CancellationToken, model_name: &str, prompt: &str) -> Result<String>;
}

/// Default generator used when no live vendor client is wired in: echoes the
/// prompt back, prefixed, exactly as the original's `echoClient`.
#[derive(Default)]
pub struct EchoGenerator;

impl EchoGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextGenerator for EchoGenerator {
    async fn generate(&self, cancellation: CancellationToken, _model_name: &str, prompt: &str) -> Result<String> {
        if cancellation.is_cancelled() {
            return Err(concierge_domain::Error::Cancelled);
        }
        Ok(format!("received and processed with Gemini: {prompt}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_generator_prefixes_the_prompt() {
        let generator = EchoGenerator::new();
        let reply = generator
            .generate(CancellationToken::new(), "gemini-2.0-flash-live-001", "hello")
            .await
            .unwrap();
        assert_eq!(reply, "received and processed with Gemini: hello");
    }

    #[tokio::test]
    async fn echo_generator_honors_a_pre_cancelled_token() {
        let generator = EchoGenerator::new();
        let token = CancellationToken::new();
        token.cancel();
        let err = generator.generate(token, "model", "hello").await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
