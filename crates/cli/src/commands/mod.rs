pub mod config;
pub mod plan;
pub mod rank;

use curate_core::config::{AppConfig, ConfigError, LoadOptions};
use curate_core::ranking::RankingPipeline;
use curate_core::{RecommendError, Scorer};
use curate_store::{Dataset, InMemoryCatalog, InMemoryProfileStore, JsonVectorStore, StoreError};
use serde::Serialize;
use serde_json::Value;

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_COLLABORATOR: u8 = 3;
pub const EXIT_NO_SOLUTION: u8 = 4;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    data: Option<Value>,
}

impl CommandResult {
    pub fn success_with(
        command: &str,
        message: impl Into<String>,
        data: Option<impl Serialize>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: None,
        };
        finish(payload, data, EXIT_OK)
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::failure_with(command, error_class, message, exit_code, Option::<()>::None)
    }

    pub fn failure_with(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        data: Option<impl Serialize>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        finish(payload, data, exit_code)
    }

    pub fn from_config_error(command: &str, error: &ConfigError) -> Self {
        Self::failure(command, "config_validation", error.to_string(), EXIT_CONFIG)
    }

    pub fn from_store_error(command: &str, error: &StoreError) -> Self {
        Self::failure(command, "dataset_unavailable", error.to_string(), EXIT_COLLABORATOR)
    }

    pub fn from_recommend_error(command: &str, error: &RecommendError) -> Self {
        let message = format!("{} ({error})", error.user_message());
        Self::failure(command, error.error_class(), message, exit_code_for(error))
    }
}

pub fn exit_code_for(error: &RecommendError) -> u8 {
    match error {
        RecommendError::InvalidConfiguration(_) => EXIT_CONFIG,
        RecommendError::NotFound { .. }
        | RecommendError::CatalogUnavailable(_)
        | RecommendError::VectorMissing(_) => EXIT_COLLABORATOR,
        RecommendError::ProfileIncomplete(_) => EXIT_FAILURE,
    }
}

fn finish(mut payload: CommandOutcome, data: Option<impl Serialize>, exit_code: u8) -> CommandResult {
    if let Some(data) = data {
        match serde_json::to_value(data) {
            Ok(value) => payload.data = Some(value),
            Err(error) => {
                return CommandResult {
                    exit_code: EXIT_FAILURE,
                    output: serialize_fallback(&payload.command, &error.to_string()),
                };
            }
        }
    }

    let output = serde_json::to_string(&payload)
        .unwrap_or_else(|error| serialize_fallback(&payload.command, &error.to_string()));
    CommandResult { exit_code, output }
}

fn serialize_fallback(command: &str, message: &str) -> String {
    format!(
        "{{\"command\":\"{}\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\",\"data\":null}}",
        escape(command),
        escape(message)
    )
}

fn escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Configuration plus the collaborators every data-reading command needs.
pub(crate) struct Runtime {
    pub config: AppConfig,
    pub catalog: InMemoryCatalog,
    pub profiles: InMemoryProfileStore,
}

impl Runtime {
    pub fn load(command: &str) -> Result<Self, CommandResult> {
        let config = AppConfig::load(LoadOptions::default())
            .map_err(|error| CommandResult::from_config_error(command, &error))?;
        let (catalog, profiles) = Dataset::load(&config.data.dataset_path)
            .and_then(Dataset::into_collaborators)
            .map_err(|error| CommandResult::from_store_error(command, &error))?;

        Ok(Self { config, catalog, profiles })
    }

    /// Ranking pipeline over the configured vector file, scorer, and options.
    pub fn ranking(
        &self,
        command: &str,
    ) -> Result<RankingPipeline<&InMemoryCatalog>, CommandResult> {
        let location = self.config.data.vectors_path.display().to_string();
        let pipeline = RankingPipeline::from_vector_source(
            &JsonVectorStore,
            &location,
            self.config.data.metric,
            &self.catalog,
        )
        .map_err(|error| CommandResult::from_recommend_error(command, &error))?;

        Ok(pipeline
            .with_scorer(Scorer::from_policy(&self.config.scoring))
            .with_options(self.config.ranking.options()))
    }
}
