use std::env;
use std::sync::{Mutex, OnceLock};

use pricewise_cli::commands::{config, doctor, migrate, optimize, report, seed};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("PRICEWISE_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("PRICEWISE_DATABASE_URL", "postgres://localhost/pricewise")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_loads_starter_catalog_into_fresh_database() {
    with_env(&[("PRICEWISE_DATABASE_URL", "sqlite::memory:")], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["message"], "starter catalog loaded: 10 products inserted");
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = TempDir::new().expect("temp dir");
    let url = file_url(&dir);

    with_env(&[("PRICEWISE_DATABASE_URL", &url)], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);
        assert_eq!(second_payload["status"], "ok");
        assert_eq!(second_payload["message"], "catalog already present; nothing inserted");
    });
}

#[test]
fn optimize_runs_a_full_pass_over_seeded_catalog() {
    let dir = TempDir::new().expect("temp dir");
    let url = file_url(&dir);

    with_env(&[("PRICEWISE_DATABASE_URL", &url)], || {
        assert_eq!(seed::run().exit_code, 0, "seed should succeed");

        let result = optimize::run(None);
        assert_eq!(result.exit_code, 0, "expected optimization success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "optimize");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("evaluated=10"), "unexpected message: {message}");
        assert!(message.contains("failed=0"), "unexpected message: {message}");
    });
}

#[test]
fn optimize_reports_unknown_product_as_not_found() {
    let dir = TempDir::new().expect("temp dir");
    let url = file_url(&dir);

    with_env(&[("PRICEWISE_DATABASE_URL", &url)], || {
        assert_eq!(seed::run().exit_code, 0, "seed should succeed");

        let result = optimize::run(Some("prod-404".to_string()));
        assert_eq!(result.exit_code, 8);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "not_found");
    });
}

#[test]
fn report_prints_dashboard_snapshot() {
    let dir = TempDir::new().expect("temp dir");
    let url = file_url(&dir);

    with_env(&[("PRICEWISE_DATABASE_URL", &url)], || {
        assert_eq!(seed::run().exit_code, 0, "seed should succeed");

        let result = report::run();
        assert_eq!(result.exit_code, 0, "expected report success");

        let snapshot = parse_payload(&result.output);
        assert_eq!(snapshot["product_count"], 10);
        assert_eq!(snapshot["total_sales"], 0);
        assert!(snapshot["categories"].as_array().is_some_and(|rows| rows.is_empty()));
    });
}

#[test]
fn doctor_passes_against_seeded_file_database() {
    let dir = TempDir::new().expect("temp dir");
    let url = file_url(&dir);

    with_env(&[("PRICEWISE_DATABASE_URL", &url)], || {
        assert_eq!(seed::run().exit_code, 0, "seed should succeed");

        let report = parse_payload(&doctor::run(true));
        assert_eq!(report["overall_status"], "pass", "doctor report: {report}");

        let names: Vec<&str> = report["checks"]
            .as_array()
            .map(|checks| checks.iter().filter_map(|check| check["name"].as_str()).collect())
            .unwrap_or_default();
        assert_eq!(
            names,
            [
                "config_validation",
                "demand_model",
                "database_connectivity",
                "schema_migrations",
                "catalog_seeded"
            ]
        );
    });
}

#[test]
fn doctor_flags_empty_catalog() {
    let dir = TempDir::new().expect("temp dir");
    let url = file_url(&dir);

    with_env(&[("PRICEWISE_DATABASE_URL", &url)], || {
        assert_eq!(migrate::run().exit_code, 0, "migrate should succeed");

        let report = parse_payload(&doctor::run(true));
        assert_eq!(report["overall_status"], "fail");
        assert!(doctor::run(false).contains("- [fail] catalog_seeded"));
    });
}

#[test]
fn config_attributes_env_sources() {
    with_env(
        &[("PRICEWISE_DATABASE_URL", "sqlite::memory:"), ("PRICEWISE_LOG_LEVEL", "debug")],
        || {
            let output = config::run();

            assert!(output
                .contains("- database.url = sqlite::memory: (source: env (PRICEWISE_DATABASE_URL))"));
            assert!(output.contains("- logging.level = debug (source: env (PRICEWISE_LOG_LEVEL))"));
            assert!(output.contains("- pricing.jitter_ms = 7000 (source: default)"));
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn file_url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("market.db").display())
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "PRICEWISE_DATABASE_URL",
        "PRICEWISE_DATABASE_MAX_CONNECTIONS",
        "PRICEWISE_DATABASE_TIMEOUT_SECS",
        "PRICEWISE_SIMULATION_ENABLED",
        "PRICEWISE_SIMULATION_SEED",
        "PRICEWISE_SIMULATION_COMPETITORS",
        "PRICEWISE_SIMULATION_SESSION_CAPACITY",
        "PRICEWISE_SIMULATION_SESSION_TTL_SECS",
        "PRICEWISE_PRICING_WARMUP_MS",
        "PRICEWISE_PRICING_BASE_INTERVAL_MS",
        "PRICEWISE_PRICING_JITTER_MS",
        "PRICEWISE_PRICING_CHANGE_THRESHOLD",
        "PRICEWISE_PRICING_COMPETITOR_SAMPLE_SIZE",
        "PRICEWISE_DEMAND_MODEL_PATH",
        "PRICEWISE_DEMAND_INTERACTION_WINDOW_SECS",
        "PRICEWISE_SERVER_BIND_ADDRESS",
        "PRICEWISE_SERVER_HEALTH_CHECK_PORT",
        "PRICEWISE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "PRICEWISE_LOGGING_LEVEL",
        "PRICEWISE_LOGGING_FORMAT",
        "PRICEWISE_LOG_LEVEL",
        "PRICEWISE_LOG_FORMAT",
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
