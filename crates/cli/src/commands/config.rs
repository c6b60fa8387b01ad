use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use curate_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};
use serde::Serialize;
use toml::Value;

use crate::commands::{CommandResult, EXIT_FAILURE};

const COMMAND: &str = "config";

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: String,
    value: String,
    source: String,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::from_config_error(COMMAND, &error),
    };
    let effective = match Value::try_from(&config) {
        Ok(effective) => effective,
        Err(error) => {
            return CommandResult::failure(COMMAND, "serialization", error.to_string(), EXIT_FAILURE)
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut leaves = Vec::new();
    flatten("", &effective, &mut leaves);

    let entries: Vec<ConfigEntry> = leaves
        .into_iter()
        .map(|(key, value)| {
            let source =
                field_source(&key, config_file_doc.as_ref(), config_file_path.as_deref());
            ConfigEntry { key, value, source }
        })
        .collect();

    let message = format!(
        "effective config, {} keys (source precedence: env > file > default)",
        entries.len()
    );
    CommandResult::success_with(COMMAND, message, Some(entries))
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(DEFAULT_CONFIG_FILE), Path::new("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Table(table) => {
            for (key, nested) in table {
                let path = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
                flatten(&path, nested, out);
            }
        }
        Value::String(text) => out.push((prefix.to_string(), text.clone())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}

/// `data.dataset_path` -> `CURATE_DATA_DATASET_PATH`.
fn env_key(key_path: &str) -> String {
    format!("CURATE_{}", key_path.replace('.', "_").to_ascii_uppercase())
}

fn field_source(
    key_path: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let mut env_keys = vec![env_key(key_path)];
    if let Some(field) = key_path.strip_prefix("logging.") {
        env_keys.push(format!("CURATE_LOG_{}", field.to_ascii_uppercase()));
    }
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
