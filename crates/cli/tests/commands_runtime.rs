use std::env;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use curate_cli::commands::plan::{self, PlanArgs};
use curate_cli::commands::{config, rank};
use curate_store::fixtures::write_demo_files;
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn rank_returns_explained_candidates_for_demo_eater() {
    with_demo_data(&[], || {
        let result = rank::run("eater-1", Some(3));
        assert_eq!(result.exit_code, 0, "expected successful ranking: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "rank");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["error_class"], Value::Null);
        assert_eq!(payload["data"]["total_ranked"], 10);

        let candidates = payload["data"]["candidates"].as_array().expect("candidate list");
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0]["rank"], 1);
        assert!(candidates[0]["scores"].as_array().is_some_and(|scores| scores.len() == 6));

        let skipped = payload["data"]["skipped"].as_array().expect("skip list");
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0]["item_id"], "r-011");
        assert_eq!(skipped[0]["reason"], "vector_missing");
    });
}

#[test]
fn rank_reports_unknown_profile_as_collaborator_failure() {
    with_demo_data(&[], || {
        let result = rank::run("nobody", None);
        assert_eq!(result.exit_code, 3);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "not_found");
    });
}

#[test]
fn rank_reports_profile_without_likes() {
    with_demo_data(&[], || {
        let result = rank::run("eater-3", None);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "profile_incomplete");
    });
}

#[test]
fn rank_fails_when_dataset_file_is_missing() {
    with_env(&[("CURATE_DATA_DATASET_PATH", "/nonexistent/catalog.json")], || {
        let result = rank::run("eater-1", None);
        assert_eq!(result.exit_code, 3);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "dataset_unavailable");
    });
}

#[test]
fn invalid_environment_override_is_a_config_failure() {
    with_demo_data(&[("CURATE_SOLVER_MAX_NODES", "lots")], || {
        let result = plan::run(&PlanArgs::for_profile("eater-1"));
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "plan");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn plan_solves_stock_meal_plan() {
    with_demo_data(&[], || {
        let result = plan::run(&PlanArgs::for_profile("eater-1"));
        assert_eq!(result.exit_code, 0, "expected a solved plan: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "ok");

        let report = &payload["data"]["report"];
        assert_eq!(report["outcome"]["status"], "solved");
        assert_eq!(report["phase"], "solved");
        let sections = report["outcome"]["detail"]["sections"].as_array().expect("sections");
        assert_eq!(sections.len(), 2);
        for section in sections {
            assert_eq!(section["candidates"].as_array().map(Vec::len), Some(3));
        }
    });
}

#[test]
fn plan_reports_infeasible_price_cap() {
    with_demo_data(&[], || {
        let args = PlanArgs { max_total_price: Decimal::ONE, ..PlanArgs::for_profile("eater-1") };
        let result = plan::run(&args);
        assert_eq!(result.exit_code, 4);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "infeasible");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("max_total_price"), "unexpected message: {message}");
        assert_eq!(payload["data"]["report"]["outcome"]["status"], "infeasible");
    });
}

#[test]
fn plan_reports_exhausted_budget() {
    with_demo_data(&[("CURATE_SOLVER_MAX_NODES", "1")], || {
        let result = plan::run(&PlanArgs::for_profile("eater-1"));
        assert_eq!(result.exit_code, 4);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "budget_exhausted");
        assert_eq!(payload["data"]["report"]["outcome"]["status"], "budget_exhausted");
    });
}

#[test]
fn plan_rejects_zero_sections() {
    with_demo_data(&[], || {
        let args = PlanArgs { sections: 0, ..PlanArgs::for_profile("eater-1") };
        let result = plan::run(&args);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_configuration");
    });
}

#[test]
fn config_attributes_env_and_default_sources() {
    with_env(&[("CURATE_SOLVER_TOP_K", "12"), ("CURATE_LOG_LEVEL", "debug")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let entries = payload["data"].as_array().expect("config entries");

        let top_k = find_entry(entries, "solver.top_k");
        assert_eq!(top_k["value"], "12");
        assert_eq!(top_k["source"], "env (CURATE_SOLVER_TOP_K)");

        let level = find_entry(entries, "logging.level");
        assert_eq!(level["value"], "debug");
        assert_eq!(level["source"], "env (CURATE_LOG_LEVEL)");

        let metric = find_entry(entries, "data.metric");
        assert_eq!(metric["value"], "cosine");
        assert_eq!(metric["source"], "default");
    });
}

fn find_entry<'a>(entries: &'a [Value], key: &str) -> &'a Value {
    entries.iter().find(|entry| entry["key"] == key).unwrap_or_else(|| panic!("missing `{key}`"))
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_demo_data(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    let dir = TempDir::new().expect("temp dir");
    let (dataset_path, vectors_path) = write_demo_files(dir.path()).expect("demo files written");
    let dataset_path = path_string(&dataset_path);
    let vectors_path = path_string(&vectors_path);

    let mut all_vars = vec![
        ("CURATE_DATA_DATASET_PATH", dataset_path.as_str()),
        ("CURATE_DATA_VECTORS_PATH", vectors_path.as_str()),
    ];
    all_vars.extend_from_slice(vars);
    with_env(&all_vars, test_fn);
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "CURATE_DATA_DATASET_PATH",
        "CURATE_DATA_VECTORS_PATH",
        "CURATE_DATA_METRIC",
        "CURATE_RANKING_MISSING_VECTOR",
        "CURATE_RANKING_SOURCE",
        "CURATE_RANKING_EXCLUDE_LIKED",
        "CURATE_RANKING_PARALLEL",
        "CURATE_SCORING_EXCLUSION_MODE",
        "CURATE_SCORING_EMPTY_LIKES",
        "CURATE_SOLVER_TOP_K",
        "CURATE_SOLVER_MAX_NODES",
        "CURATE_SOLVER_MAX_MILLIS",
        "CURATE_SOLVER_ALLOW_REUSE",
        "CURATE_LOGGING_LEVEL",
        "CURATE_LOGGING_FORMAT",
        "CURATE_LOG_LEVEL",
        "CURATE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
