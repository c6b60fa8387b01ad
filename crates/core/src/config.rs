use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ranking::{CandidateSource, MissingVectorPolicy, RankingOptions};
use crate::scoring::{EmptyLikesPolicy, ExclusionMode, ScoringPolicy};
use crate::solver::{SearchBudget, DEFAULT_MAX_NODES};
use crate::vectors::SimilarityMetric;

pub const DEFAULT_CONFIG_FILE: &str = "curate.toml";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppConfig {
    pub data: DataConfig,
    pub scoring: ScoringPolicy,
    pub ranking: RankingConfig,
    pub solver: SolverSettings,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DataConfig {
    pub dataset_path: PathBuf,
    pub vectors_path: PathBuf,
    pub metric: SimilarityMetric,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    All,
    SimilarToLiked,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankingConfig {
    pub missing_vector: MissingVectorPolicy,
    pub source: SourceKind,
    pub similar_top_n: usize,
    pub exclude_liked: bool,
    pub parallel: bool,
}

impl RankingConfig {
    pub fn options(&self) -> RankingOptions {
        let source = match self.source {
            SourceKind::All => CandidateSource::All,
            SourceKind::SimilarToLiked => {
                CandidateSource::SimilarToLiked { top_n: self.similar_top_n }
            }
        };
        RankingOptions {
            missing_vector: self.missing_vector,
            source,
            exclude_liked: self.exclude_liked,
            parallel: self.parallel,
        }
    }
}

/// Search limits. Zero disables the corresponding limit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SolverSettings {
    pub top_k: usize,
    pub max_nodes: u64,
    pub max_millis: u64,
    pub allow_reuse: bool,
}

impl SolverSettings {
    pub fn top_k(&self) -> Option<usize> {
        (self.top_k > 0).then_some(self.top_k)
    }

    pub fn budget(&self) -> SearchBudget {
        SearchBudget {
            max_nodes: (self.max_nodes > 0).then_some(self.max_nodes),
            max_duration: (self.max_millis > 0).then(|| Duration::from_millis(self.max_millis)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub dataset_path: Option<PathBuf>,
    pub vectors_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub top_k: Option<usize>,
    pub max_nodes: Option<u64>,
    pub allow_reuse: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig {
                dataset_path: PathBuf::from("data/catalog.json"),
                vectors_path: PathBuf::from("data/vectors.json"),
                metric: SimilarityMetric::Cosine,
            },
            scoring: ScoringPolicy::default(),
            ranking: RankingConfig {
                missing_vector: MissingVectorPolicy::Skip,
                source: SourceKind::All,
                similar_top_n: 20,
                exclude_liked: false,
                parallel: false,
            },
            solver: SolverSettings {
                top_k: 0,
                max_nodes: DEFAULT_MAX_NODES,
                max_millis: 0,
                allow_reuse: false,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "similar_to_liked" => Ok(Self::SimilarToLiked),
            other => Err(ConfigError::Validation(format!(
                "unsupported candidate source `{other}` (expected all|similar_to_liked)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(data) = patch.data {
            if let Some(dataset_path) = data.dataset_path {
                self.data.dataset_path = dataset_path;
            }
            if let Some(vectors_path) = data.vectors_path {
                self.data.vectors_path = vectors_path;
            }
            if let Some(metric) = data.metric {
                self.data.metric = metric;
            }
        }

        if let Some(scoring) = patch.scoring {
            let policy = &mut self.scoring;
            set_if_some(&mut policy.similarity_weight, scoring.similarity_weight);
            set_if_some(&mut policy.similarity_threshold, scoring.similarity_threshold);
            set_if_some(&mut policy.prohibited_country_penalty, scoring.prohibited_country_penalty);
            set_if_some(&mut policy.exclusion_mode, scoring.exclusion_mode);
            set_if_some(&mut policy.rating_divisor, scoring.rating_divisor);
            set_if_some(&mut policy.rating_weight, scoring.rating_weight);
            set_if_some(&mut policy.high_rating_cutoff, scoring.high_rating_cutoff);
            set_if_some(&mut policy.brand_bonus, scoring.brand_bonus);
            set_if_some(&mut policy.style_bonus, scoring.style_bonus);
            set_if_some(&mut policy.country_bonus, scoring.country_bonus);
            set_if_some(&mut policy.empty_likes, scoring.empty_likes);
        }

        if let Some(ranking) = patch.ranking {
            set_if_some(&mut self.ranking.missing_vector, ranking.missing_vector);
            set_if_some(&mut self.ranking.source, ranking.source);
            set_if_some(&mut self.ranking.similar_top_n, ranking.similar_top_n);
            set_if_some(&mut self.ranking.exclude_liked, ranking.exclude_liked);
            set_if_some(&mut self.ranking.parallel, ranking.parallel);
        }

        if let Some(solver) = patch.solver {
            set_if_some(&mut self.solver.top_k, solver.top_k);
            set_if_some(&mut self.solver.max_nodes, solver.max_nodes);
            set_if_some(&mut self.solver.max_millis, solver.max_millis);
            set_if_some(&mut self.solver.allow_reuse, solver.allow_reuse);
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CURATE_DATA_DATASET_PATH") {
            self.data.dataset_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("CURATE_DATA_VECTORS_PATH") {
            self.data.vectors_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("CURATE_DATA_METRIC") {
            self.data.metric = parse_with("CURATE_DATA_METRIC", &value)?;
        }

        let policy = &mut self.scoring;
        for (key, slot) in [
            ("CURATE_SCORING_SIMILARITY_WEIGHT", &mut policy.similarity_weight),
            ("CURATE_SCORING_SIMILARITY_THRESHOLD", &mut policy.similarity_threshold),
            ("CURATE_SCORING_PROHIBITED_COUNTRY_PENALTY", &mut policy.prohibited_country_penalty),
            ("CURATE_SCORING_RATING_DIVISOR", &mut policy.rating_divisor),
            ("CURATE_SCORING_RATING_WEIGHT", &mut policy.rating_weight),
            ("CURATE_SCORING_HIGH_RATING_CUTOFF", &mut policy.high_rating_cutoff),
            ("CURATE_SCORING_BRAND_BONUS", &mut policy.brand_bonus),
            ("CURATE_SCORING_STYLE_BONUS", &mut policy.style_bonus),
            ("CURATE_SCORING_COUNTRY_BONUS", &mut policy.country_bonus),
        ] {
            if let Some(value) = read_env(key) {
                *slot = parse_f64(key, &value)?;
            }
        }
        if let Some(value) = read_env("CURATE_SCORING_EXCLUSION_MODE") {
            policy.exclusion_mode =
                parse_with::<ExclusionMode>("CURATE_SCORING_EXCLUSION_MODE", &value)?;
        }
        if let Some(value) = read_env("CURATE_SCORING_EMPTY_LIKES") {
            policy.empty_likes = parse_with::<EmptyLikesPolicy>("CURATE_SCORING_EMPTY_LIKES", &value)?;
        }

        if let Some(value) = read_env("CURATE_RANKING_MISSING_VECTOR") {
            self.ranking.missing_vector = parse_with("CURATE_RANKING_MISSING_VECTOR", &value)?;
        }
        if let Some(value) = read_env("CURATE_RANKING_SOURCE") {
            self.ranking.source = value.parse()?;
        }
        if let Some(value) = read_env("CURATE_RANKING_SIMILAR_TOP_N") {
            self.ranking.similar_top_n = parse_usize("CURATE_RANKING_SIMILAR_TOP_N", &value)?;
        }
        if let Some(value) = read_env("CURATE_RANKING_EXCLUDE_LIKED") {
            self.ranking.exclude_liked = parse_bool("CURATE_RANKING_EXCLUDE_LIKED", &value)?;
        }
        if let Some(value) = read_env("CURATE_RANKING_PARALLEL") {
            self.ranking.parallel = parse_bool("CURATE_RANKING_PARALLEL", &value)?;
        }

        if let Some(value) = read_env("CURATE_SOLVER_TOP_K") {
            self.solver.top_k = parse_usize("CURATE_SOLVER_TOP_K", &value)?;
        }
        if let Some(value) = read_env("CURATE_SOLVER_MAX_NODES") {
            self.solver.max_nodes = parse_u64("CURATE_SOLVER_MAX_NODES", &value)?;
        }
        if let Some(value) = read_env("CURATE_SOLVER_MAX_MILLIS") {
            self.solver.max_millis = parse_u64("CURATE_SOLVER_MAX_MILLIS", &value)?;
        }
        if let Some(value) = read_env("CURATE_SOLVER_ALLOW_REUSE") {
            self.solver.allow_reuse = parse_bool("CURATE_SOLVER_ALLOW_REUSE", &value)?;
        }

        let log_level = read_env("CURATE_LOGGING_LEVEL").or_else(|| read_env("CURATE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CURATE_LOGGING_FORMAT").or_else(|| read_env("CURATE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(dataset_path) = overrides.dataset_path {
            self.data.dataset_path = dataset_path;
        }
        if let Some(vectors_path) = overrides.vectors_path {
            self.data.vectors_path = vectors_path;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(top_k) = overrides.top_k {
            self.solver.top_k = top_k;
        }
        if let Some(max_nodes) = overrides.max_nodes {
            self.solver.max_nodes = max_nodes;
        }
        if let Some(allow_reuse) = overrides.allow_reuse {
            self.solver.allow_reuse = allow_reuse;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_data(&self.data)?;
        self.scoring.validate().map_err(ConfigError::Validation)?;
        validate_ranking(&self.ranking)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn set_if_some<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), Path::new("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_data(data: &DataConfig) -> Result<(), ConfigError> {
    if data.dataset_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("data.dataset_path must not be empty".to_string()));
    }
    if data.vectors_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("data.vectors_path must not be empty".to_string()));
    }
    Ok(())
}

fn validate_ranking(ranking: &RankingConfig) -> Result<(), ConfigError> {
    if ranking.source == SourceKind::SimilarToLiked && ranking.similar_top_n == 0 {
        return Err(ConfigError::Validation(
            "ranking.similar_top_n must be greater than zero when ranking.source is similar_to_liked"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| invalid_override(key, value))
}

fn parse_with<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    value.parse::<T>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    data: Option<DataPatch>,
    scoring: Option<ScoringPatch>,
    ranking: Option<RankingPatch>,
    solver: Option<SolverPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPatch {
    dataset_path: Option<PathBuf>,
    vectors_path: Option<PathBuf>,
    metric: Option<SimilarityMetric>,
}

#[derive(Debug, Default, Deserialize)]
struct ScoringPatch {
    similarity_weight: Option<f64>,
    similarity_threshold: Option<f64>,
    prohibited_country_penalty: Option<f64>,
    exclusion_mode: Option<ExclusionMode>,
    rating_divisor: Option<f64>,
    rating_weight: Option<f64>,
    high_rating_cutoff: Option<f64>,
    brand_bonus: Option<f64>,
    style_bonus: Option<f64>,
    country_bonus: Option<f64>,
    empty_likes: Option<EmptyLikesPolicy>,
}

#[derive(Debug, Default, Deserialize)]
struct RankingPatch {
    missing_vector: Option<MissingVectorPolicy>,
    source: Option<SourceKind>,
    similar_top_n: Option<usize>,
    exclude_liked: Option<bool>,
    parallel: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct SolverPatch {
    top_k: Option<usize>,
    max_nodes: Option<u64>,
    max_millis: Option<u64>,
    allow_reuse: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
