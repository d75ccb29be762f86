use std::env;
use std::fs;
use std::path::Path;

use pricewise_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_keys) in effective_fields(&config) {
        let source =
            field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

fn effective_fields(config: &AppConfig) -> Vec<EffectiveField> {
    let seed =
        config.simulation.seed.map_or_else(|| "<unset>".to_string(), |seed| seed.to_string());
    let model_path = config
        .demand
        .model_path
        .as_ref()
        .map_or_else(|| "<unset>".to_string(), |path| path.display().to_string());

    vec![
        field("database.url", config.database.url.clone(), &["PRICEWISE_DATABASE_URL"]),
        field(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["PRICEWISE_DATABASE_MAX_CONNECTIONS"],
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["PRICEWISE_DATABASE_TIMEOUT_SECS"],
        ),
        field(
            "simulation.enabled",
            config.simulation.enabled.to_string(),
            &["PRICEWISE_SIMULATION_ENABLED"],
        ),
        field("simulation.seed", seed, &["PRICEWISE_SIMULATION_SEED"]),
        field(
            "simulation.competitors",
            config.simulation.competitors.join(","),
            &["PRICEWISE_SIMULATION_COMPETITORS"],
        ),
        field(
            "simulation.session_capacity",
            config.simulation.session_capacity.to_string(),
            &["PRICEWISE_SIMULATION_SESSION_CAPACITY"],
        ),
        field(
            "simulation.session_ttl_secs",
            config.simulation.session_ttl_secs.to_string(),
            &["PRICEWISE_SIMULATION_SESSION_TTL_SECS"],
        ),
        field(
            "pricing.warmup_ms",
            config.pricing.warmup_ms.to_string(),
            &["PRICEWISE_PRICING_WARMUP_MS"],
        ),
        field(
            "pricing.base_interval_ms",
            config.pricing.base_interval_ms.to_string(),
            &["PRICEWISE_PRICING_BASE_INTERVAL_MS"],
        ),
        field(
            "pricing.jitter_ms",
            config.pricing.jitter_ms.to_string(),
            &["PRICEWISE_PRICING_JITTER_MS"],
        ),
        field(
            "pricing.change_threshold",
            config.pricing.change_threshold.to_string(),
            &["PRICEWISE_PRICING_CHANGE_THRESHOLD"],
        ),
        field(
            "pricing.competitor_sample_size",
            config.pricing.competitor_sample_size.to_string(),
            &["PRICEWISE_PRICING_COMPETITOR_SAMPLE_SIZE"],
        ),
        field("demand.model_path", model_path, &["PRICEWISE_DEMAND_MODEL_PATH"]),
        field(
            "demand.interaction_window_secs",
            config.demand.interaction_window_secs.to_string(),
            &["PRICEWISE_DEMAND_INTERACTION_WINDOW_SECS"],
        ),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["PRICEWISE_SERVER_BIND_ADDRESS"],
        ),
        field(
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            &["PRICEWISE_SERVER_HEALTH_CHECK_PORT"],
        ),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["PRICEWISE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["PRICEWISE_LOGGING_LEVEL", "PRICEWISE_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["PRICEWISE_LOGGING_FORMAT", "PRICEWISE_LOG_FORMAT"],
        ),
    ]
}

type EffectiveField = (&'static str, String, &'static [&'static str]);

fn field(
    key_path: &'static str,
    value: String,
    env_keys: &'static [&'static str],
) -> EffectiveField {
    (key_path, value, env_keys)
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let set_env = env_keys
        .iter()
        .find(|env_key| env::var(env_key).is_ok_and(|value| !value.trim().is_empty()));
    if let Some(env_key) = set_env {
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

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
