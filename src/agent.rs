use crate::config::prompt::PromptConfig;
use crate::llm::LlmError;
use crate::llm::chat::ClientHandle;
use crate::llm::retry::{ retry_with_backoff, RetryPolicy };
use crate::models::agent::PipelineResult;
use crate::models::chat::ChatMessage;

use log::{ debug, info };
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Failed to generate proposal: {0}")]
    Proposal(#[source] LlmError),

    #[error("Failed to generate critic review: {0}")]
    CriticReview(#[source] LlmError),
}

/// Two-stage pipeline: an architecture proposal, optionally followed by a critic review of it.
///
/// Holds only read-only state, so one instance is shared by all requests.
#[derive(Clone)]
pub struct ArchitectAgent {
    client: ClientHandle,
    prompt_config: Arc<PromptConfig>,
    retry_policy: RetryPolicy,
}

impl ArchitectAgent {
    pub fn new(client: ClientHandle, prompt_config: Arc<PromptConfig>, retry_policy: RetryPolicy) -> Self {
        Self { client, prompt_config, retry_policy }
    }

    pub fn client_ready(&self) -> bool {
        self.client.is_ready()
    }

    pub async fn run(&self, problem: &str, enable_critic: bool) -> Result<PipelineResult, AgentError> {
        info!("Running pipeline: problem={} chars, critic={}", problem.chars().count(), enable_critic);

        let proposal = self.generate_proposal(problem).await?;
        info!("Proposal generated: {} chars", proposal.chars().count());

        let critic_review = if enable_critic {
            let review = self.critic_review(&proposal).await?;
            info!("Critic review generated: {} chars", review.chars().count());
            Some(review)
        } else {
            None
        };

        Ok(PipelineResult { proposal, critic_review })
    }

    pub async fn generate_proposal(&self, problem: &str) -> Result<String, AgentError> {
        let messages = [
            ChatMessage::system(self.prompt_config.system_prompt.as_str()),
            ChatMessage::user(self.prompt_config.render_problem(problem)),
        ];
        self.chat("proposal", &messages).await.map_err(AgentError::Proposal)
    }

    pub async fn critic_review(&self, proposal: &str) -> Result<String, AgentError> {
        let messages = [
            ChatMessage::system(self.prompt_config.critic_prompt.as_str()),
            ChatMessage::user(proposal),
        ];
        self.chat("critic review", &messages).await.map_err(AgentError::CriticReview)
    }

    async fn chat(&self, label: &str, messages: &[ChatMessage]) -> Result<String, LlmError> {
        retry_with_backoff(&self.retry_policy, label, |attempt| async move {
            let client = self.client.get()?;
            debug!("Invoking chat model for {} (attempt {})", label, attempt);
            client.complete(messages).await
        }).await
    }
}
