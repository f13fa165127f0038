use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use log::info;

pub const PROBLEM_PLACEHOLDER: &str = "{problem}";

const DEFAULT_SYSTEM_PROMPT: &str = concat!(
    "Você é um ARQUITETO DE SOLUÇÕES cloud-native especializado em IA generativa e agentes. ",
    "Receberá um problema e deve devolver uma proposta clara, objetiva e acionável. ",
    "Formato de saída: \n",
    "1) Visão geral (3-5 bullets) \n",
    "2) Arquitetura (componentes e fluxo) \n",
    "3) Padrões cloud-native (resiliência/observabilidade) \n",
    "4) Custos & riscos (resumo) \n",
    "5) Próximos passos (checklist curto) \n"
);

const DEFAULT_CRITIC_PROMPT: &str = concat!(
    "Atue como um REVISOR ESTRUTURADO. Avalie a resposta do arquiteto e devolva: ",
    "(a) pontos fortes (b) lacunas técnicas (c) riscos não cobertos (d) ajustes rápidos."
);

const DEFAULT_USER_TEMPLATE: &str = "Problema: {problem}";

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Prompt file IO error for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Prompt JSON parsing error for '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Prompt '{0}' must not be empty")]
    Empty(&'static str),

    #[error("user_template must contain the {{problem}} placeholder")]
    MissingPlaceholder,
}

/// The fixed instructions sent with every pipeline call.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PromptConfig {
    pub system_prompt: String,
    pub critic_prompt: String,
    pub user_template: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            critic_prompt: DEFAULT_CRITIC_PROMPT.to_string(),
            user_template: DEFAULT_USER_TEMPLATE.to_string(),
        }
    }
}

impl PromptConfig {
    fn validate(&self) -> Result<(), PromptError> {
        if self.system_prompt.trim().is_empty() {
            return Err(PromptError::Empty("system_prompt"));
        }
        if self.critic_prompt.trim().is_empty() {
            return Err(PromptError::Empty("critic_prompt"));
        }
        if !self.user_template.contains(PROBLEM_PLACEHOLDER) {
            return Err(PromptError::MissingPlaceholder);
        }
        Ok(())
    }

    pub fn render_problem(&self, problem: &str) -> String {
        self.user_template.replace(PROBLEM_PLACEHOLDER, problem)
    }
}

/// Parses a prompt override. Keys that are absent keep their built-in value.
pub fn load_prompts_from_str(json: &str, path: &str) -> Result<PromptConfig, PromptError> {
    let config: PromptConfig = serde_json::from_str(json).map_err(|source| PromptError::Json {
        path: path.to_string(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<PromptConfig, PromptError> {
    let path_str = path.as_ref().display().to_string();
    let content = fs::read_to_string(&path).map_err(|source| PromptError::Io {
        path: path_str.clone(),
        source,
    })?;
    load_prompts_from_str(&content, &path_str)
}

/// Returns the built-in prompts, or the override file when one is configured.
pub fn resolve_prompts(path: Option<&str>) -> Result<Arc<PromptConfig>, PromptError> {
    match path.filter(|p| !p.trim().is_empty()) {
        Some(p) => {
            let config = load_prompts(p)?;
            info!("Loaded prompt overrides from: {}", p);
            Ok(Arc::new(config))
        }
        None => Ok(Arc::new(PromptConfig::default())),
    }
}
