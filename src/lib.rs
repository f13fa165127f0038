pub mod agent;
pub mod models;
pub mod server;
pub mod config;
pub mod llm;
pub mod cli;

use agent::ArchitectAgent;
use cli::{ mask_secret, Args };
use config::prompt::resolve_prompts;
use llm::chat::ClientHandle;
use llm::retry::RetryPolicy;
use llm::{ GenerationParams, LlmConfig, LlmType };
use log::{ info, error };
use server::Server;
use server::api::AppState;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

pub fn llm_config_from_args(args: &Args) -> Result<LlmConfig, Box<dyn Error + Send + Sync>> {
    let llm_type: LlmType = args.provider.parse()?;
    Ok(LlmConfig {
        llm_type,
        api_key: args.api_key.clone().filter(|k| !k.trim().is_empty()),
        base_url: args.endpoint.clone().filter(|u| !u.trim().is_empty()),
        api_version: args.api_version.clone(),
        deployment: args.deployment.clone(),
        params: GenerationParams {
            temperature: args.temperature,
            max_completion_tokens: args.max_completion_tokens,
        },
        timeout: Duration::from_secs(args.timeout_secs),
    })
}

pub fn retry_policy_from_args(args: &Args) -> RetryPolicy {
    RetryPolicy::new(
        args.retry_max_attempts,
        Duration::from_millis(args.retry_initial_backoff_ms),
        Duration::from_millis(args.retry_max_backoff_ms)
    )
}

/// Builds the pipeline once at startup. Failures are captured so the server can
/// still start and report them per request.
pub fn build_state(args: &Args) -> AppState {
    let llm_config = match llm_config_from_args(args) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid LLM configuration: {}", e);
            return AppState::failed(e.to_string());
        }
    };

    let prompts = match resolve_prompts(args.prompts_path.as_deref()) {
        Ok(prompts) => prompts,
        Err(e) => {
            error!("Failed to load prompts: {}", e);
            return AppState::failed(e.to_string());
        }
    };

    let client = ClientHandle::from_config(&llm_config);
    let agent = ArchitectAgent::new(client, prompts, retry_policy_from_args(args));
    info!("Agent pipeline initialized");
    AppState::ready(Arc::new(agent))
}

fn log_configuration(args: &Args) {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("LLM Provider: {}", args.provider);
    info!("Endpoint: {}", args.endpoint.as_deref().unwrap_or("<not set>"));
    info!("API Key: {}", mask_secret(args.api_key.as_deref()));
    info!("API Version: {}", args.api_version);
    info!("Deployment: {}", args.deployment);
    info!("Temperature: {}", args.temperature);
    info!("Max Completion Tokens: {}", args.max_completion_tokens);
    info!("Request Timeout: {}s", args.timeout_secs);
    info!(
        "Retry: {} attempts, backoff {}ms..{}ms",
        args.retry_max_attempts,
        args.retry_initial_backoff_ms,
        args.retry_max_backoff_ms
    );
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("<built-in>"));
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");
}

async fn run_once(
    args: &Args,
    state: &AppState,
    problem: &str
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let agent = state.agent().map_err(|reason| format!("Failed to load agent: {}", reason))?;
    let result = agent.run(problem, !args.no_critic).await?;

    println!("\n[PROPOSAL]");
    println!("{}", result.proposal);
    if let Some(review) = result.critic_review {
        println!("\n[CRITIC REVIEW]");
        println!("{}", review);
    }
    Ok(())
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    log_configuration(&args);

    let state = build_state(&args);

    if let Some(problem) = args.problem.as_deref() {
        info!("One-shot mode: running pipeline without starting the server");
        return run_once(&args, &state, problem).await;
    }

    let server = Server::new(state, args);
    server.run().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["architect-agent"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn missing_credentials_still_build_an_agent() {
        let state = build_state(&args(&["--api-key", "", "--endpoint", ""]));
        let agent = state.agent().unwrap();
        assert!(!agent.client_ready());
    }

    #[test]
    fn unreadable_prompt_file_is_captured() {
        let state = build_state(&args(&["--prompts-path", "/no/such/prompts.json"]));
        let reason = state.agent().err().unwrap();
        assert!(reason.contains("/no/such/prompts.json"));
    }

    #[test]
    fn unknown_provider_is_captured() {
        let state = build_state(&args(&["--provider", "carrier-pigeon"]));
        assert!(state.agent().is_err());
    }

    #[test]
    fn args_map_onto_llm_config() {
        let config = llm_config_from_args(&args(&[
            "--provider",
            "openai",
            "--api-key",
            "sk",
            "--endpoint",
            "http://localhost:1234",
            "--timeout-secs",
            "5",
        ])).unwrap();
        assert_eq!(config.llm_type, LlmType::OpenAI);
        assert_eq!(config.api_key.as_deref(), Some("sk"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.params, GenerationParams::default());

        let policy = retry_policy_from_args(&args(&[]));
        assert_eq!(policy, RetryPolicy::default());
    }
}
