use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schedule::Cadence;
use crate::simulation::{SimulationSettings, DEFAULT_COMPETITORS};

pub const CONFIG_FILE_NAME: &str = "pricewise.toml";
pub const NESTED_CONFIG_FILE: &str = "config/pricewise.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub simulation: SimulationConfig,
    pub pricing: PricingConfig,
    pub demand: DemandConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SimulationConfig {
    pub enabled: bool,
    pub seed: Option<u64>,
    pub competitors: Vec<String>,
    pub session_capacity: usize,
    pub session_ttl_secs: u64,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    pub warmup_ms: u64,
    pub base_interval_ms: u64,
    pub jitter_ms: u64,
    pub change_threshold: f64,
    pub competitor_sample_size: usize,
}

#[derive(Clone, Debug)]
pub struct DemandConfig {
    pub model_path: Option<PathBuf>,
    pub interaction_window_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
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
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub simulation_enabled: Option<bool>,
    pub simulation_seed: Option<u64>,
    pub demand_model_path: Option<PathBuf>,
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
            database: DatabaseConfig {
                url: "sqlite://pricewise.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            simulation: SimulationConfig {
                enabled: true,
                seed: None,
                competitors: DEFAULT_COMPETITORS.iter().map(|name| name.to_string()).collect(),
                session_capacity: 512,
                session_ttl_secs: 1_800,
            },
            pricing: PricingConfig {
                warmup_ms: 3_000,
                base_interval_ms: 8_000,
                jitter_ms: 7_000,
                change_threshold: 0.5,
                competitor_sample_size: 15,
            },
            demand: DemandConfig { model_path: None, interaction_window_secs: 300 },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
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

impl SimulationConfig {
    pub fn settings(&self) -> SimulationSettings {
        SimulationSettings {
            seed: self.seed,
            competitors: self.competitors.clone(),
            session_capacity: self.session_capacity,
            session_ttl: chrono::Duration::seconds(
                i64::try_from(self.session_ttl_secs).unwrap_or(i64::MAX),
            ),
            ..SimulationSettings::default()
        }
    }
}

impl PricingConfig {
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    pub fn cadence(&self) -> Cadence {
        Cadence::from_millis(self.base_interval_ms, self.jitter_ms)
    }
}

impl DemandConfig {
    pub fn interaction_window(&self) -> Duration {
        Duration::from_secs(self.interaction_window_secs)
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
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(simulation) = patch.simulation {
            if let Some(enabled) = simulation.enabled {
                self.simulation.enabled = enabled;
            }
            if let Some(seed) = simulation.seed {
                self.simulation.seed = Some(seed);
            }
            if let Some(competitors) = simulation.competitors {
                self.simulation.competitors = competitors;
            }
            if let Some(session_capacity) = simulation.session_capacity {
                self.simulation.session_capacity = session_capacity;
            }
            if let Some(session_ttl_secs) = simulation.session_ttl_secs {
                self.simulation.session_ttl_secs = session_ttl_secs;
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(warmup_ms) = pricing.warmup_ms {
                self.pricing.warmup_ms = warmup_ms;
            }
            if let Some(base_interval_ms) = pricing.base_interval_ms {
                self.pricing.base_interval_ms = base_interval_ms;
            }
            if let Some(jitter_ms) = pricing.jitter_ms {
                self.pricing.jitter_ms = jitter_ms;
            }
            if let Some(change_threshold) = pricing.change_threshold {
                self.pricing.change_threshold = change_threshold;
            }
            if let Some(competitor_sample_size) = pricing.competitor_sample_size {
                self.pricing.competitor_sample_size = competitor_sample_size;
            }
        }

        if let Some(demand) = patch.demand {
            if let Some(model_path) = demand.model_path {
                self.demand.model_path = Some(model_path);
            }
            if let Some(interaction_window_secs) = demand.interaction_window_secs {
                self.demand.interaction_window_secs = interaction_window_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
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
        if let Some(value) = read_env("PRICEWISE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("PRICEWISE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_env("PRICEWISE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("PRICEWISE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("PRICEWISE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PRICEWISE_SIMULATION_ENABLED") {
            self.simulation.enabled = parse_env("PRICEWISE_SIMULATION_ENABLED", &value)?;
        }
        if let Some(value) = read_env("PRICEWISE_SIMULATION_SEED") {
            self.simulation.seed = Some(parse_env("PRICEWISE_SIMULATION_SEED", &value)?);
        }
        if let Some(value) = read_env("PRICEWISE_SIMULATION_COMPETITORS") {
            self.simulation.competitors = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = read_env("PRICEWISE_SIMULATION_SESSION_CAPACITY") {
            self.simulation.session_capacity =
                parse_env("PRICEWISE_SIMULATION_SESSION_CAPACITY", &value)?;
        }
        if let Some(value) = read_env("PRICEWISE_SIMULATION_SESSION_TTL_SECS") {
            self.simulation.session_ttl_secs =
                parse_env("PRICEWISE_SIMULATION_SESSION_TTL_SECS", &value)?;
        }

        if let Some(value) = read_env("PRICEWISE_PRICING_WARMUP_MS") {
            self.pricing.warmup_ms = parse_env("PRICEWISE_PRICING_WARMUP_MS", &value)?;
        }
        if let Some(value) = read_env("PRICEWISE_PRICING_BASE_INTERVAL_MS") {
            self.pricing.base_interval_ms =
                parse_env("PRICEWISE_PRICING_BASE_INTERVAL_MS", &value)?;
        }
        if let Some(value) = read_env("PRICEWISE_PRICING_JITTER_MS") {
            self.pricing.jitter_ms = parse_env("PRICEWISE_PRICING_JITTER_MS", &value)?;
        }
        if let Some(value) = read_env("PRICEWISE_PRICING_CHANGE_THRESHOLD") {
            self.pricing.change_threshold =
                parse_env("PRICEWISE_PRICING_CHANGE_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("PRICEWISE_PRICING_COMPETITOR_SAMPLE_SIZE") {
            self.pricing.competitor_sample_size =
                parse_env("PRICEWISE_PRICING_COMPETITOR_SAMPLE_SIZE", &value)?;
        }

        if let Some(value) = read_env("PRICEWISE_DEMAND_MODEL_PATH") {
            self.demand.model_path = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("PRICEWISE_DEMAND_INTERACTION_WINDOW_SECS") {
            self.demand.interaction_window_secs =
                parse_env("PRICEWISE_DEMAND_INTERACTION_WINDOW_SECS", &value)?;
        }

        if let Some(value) = read_env("PRICEWISE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PRICEWISE_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_env("PRICEWISE_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("PRICEWISE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_env("PRICEWISE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("PRICEWISE_LOGGING_LEVEL").or_else(|| read_env("PRICEWISE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PRICEWISE_LOGGING_FORMAT").or_else(|| read_env("PRICEWISE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(enabled) = overrides.simulation_enabled {
            self.simulation.enabled = enabled;
        }
        if let Some(seed) = overrides.simulation_seed {
            self.simulation.seed = Some(seed);
        }
        if let Some(model_path) = overrides.demand_model_path {
            self.demand.model_path = Some(model_path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_simulation(&self.simulation)?;
        validate_pricing(&self.pricing)?;
        validate_demand(&self.demand)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(CONFIG_FILE_NAME), PathBuf::from(NESTED_CONFIG_FILE)]
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

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_simulation(simulation: &SimulationConfig) -> Result<(), ConfigError> {
    if simulation.competitors.is_empty() {
        return Err(ConfigError::Validation(
            "simulation.competitors must name at least one competitor".to_string(),
        ));
    }
    if simulation.competitors.iter().any(|name| name.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "simulation.competitors must not contain blank names".to_string(),
        ));
    }

    if simulation.session_capacity == 0 {
        return Err(ConfigError::Validation(
            "simulation.session_capacity must be greater than zero".to_string(),
        ));
    }

    if simulation.session_ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "simulation.session_ttl_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    if pricing.base_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "pricing.base_interval_ms must be greater than zero".to_string(),
        ));
    }

    if !pricing.change_threshold.is_finite() || pricing.change_threshold < 0.0 {
        return Err(ConfigError::Validation(
            "pricing.change_threshold must be a non-negative number".to_string(),
        ));
    }

    if pricing.competitor_sample_size == 0 {
        return Err(ConfigError::Validation(
            "pricing.competitor_sample_size must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_demand(demand: &DemandConfig) -> Result<(), ConfigError> {
    if demand.interaction_window_secs == 0 {
        return Err(ConfigError::Validation(
            "demand.interaction_window_secs must be greater than zero".to_string(),
        ));
    }

    if demand.model_path.as_ref().is_some_and(|path| path.as_os_str().is_empty()) {
        return Err(ConfigError::Validation(
            "demand.model_path must not be empty when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
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

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    simulation: Option<SimulationPatch>,
    pricing: Option<PricingPatch>,
    demand: Option<DemandPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SimulationPatch {
    enabled: Option<bool>,
    seed: Option<u64>,
    competitors: Option<Vec<String>>,
    session_capacity: Option<usize>,
    session_ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    warmup_ms: Option<u64>,
    base_interval_ms: Option<u64>,
    jitter_ms: Option<u64>,
    change_threshold: Option<f64>,
    competitor_sample_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct DemandPatch {
    model_path: Option<PathBuf>,
    interaction_window_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_market_cadence() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.pricing.warmup() == Duration::from_secs(3), "warm-up should be 3s")?;
        ensure(config.pricing.cadence().base == Duration::from_secs(8), "base interval is 8s")?;
        ensure(config.pricing.cadence().jitter == Duration::from_secs(7), "jitter is 7s")?;
        ensure(config.pricing.competitor_sample_size == 15, "competitor sample is 15")?;
        ensure(config.simulation.competitors.len() == 5, "five default competitors")?;
        ensure(config.demand.interaction_window() == Duration::from_secs(300), "5 minute window")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_PRICEWISE_DB_PATH", "/tmp/pricewise-interpolated.db");
        env::set_var("TEST_PRICEWISE_SEED", "1234");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("pricewise.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://${TEST_PRICEWISE_DB_PATH}"

[simulation]
seed = ${TEST_PRICEWISE_SEED}
competitors = ["PriceKing", "ValueMart"]
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite:///tmp/pricewise-interpolated.db",
                "database url should be interpolated from environment",
            )?;
            ensure(config.simulation.seed == Some(1234), "seed should be interpolated")?;
            ensure(config.simulation.competitors.len() == 2, "competitors come from the file")?;
            Ok(())
        })();

        clear_vars(&["TEST_PRICEWISE_DB_PATH", "TEST_PRICEWISE_SEED"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRICEWISE_LOG_LEVEL", "warn");
        env::set_var("PRICEWISE_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["PRICEWISE_LOG_LEVEL", "PRICEWISE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRICEWISE_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("PRICEWISE_PRICING_JITTER_MS", "1000");
        env::set_var("PRICEWISE_SIMULATION_COMPETITORS", "Alpha, Beta ,Gamma");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("pricewise.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[pricing]
jitter_ms = 500
change_threshold = 1.25

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    simulation_enabled: Some(false),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.pricing.jitter_ms == 1000, "env jitter should win over file")?;
            ensure(
                config.pricing.change_threshold == 1.25,
                "file threshold should win over default",
            )?;
            ensure(
                config.simulation.competitors == ["Alpha", "Beta", "Gamma"],
                "env competitor list should be split and trimmed",
            )?;
            ensure(!config.simulation.enabled, "override should disable the simulator")?;
            Ok(())
        })();

        clear_vars(&[
            "PRICEWISE_DATABASE_URL",
            "PRICEWISE_PRICING_JITTER_MS",
            "PRICEWISE_SIMULATION_COMPETITORS",
        ]);
        result
    }

    #[test]
    fn invalid_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRICEWISE_SIMULATION_SEED", "not-a-number");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected override failure but config load succeeded".into()),
                Err(error) => error,
            };
            let names_variable = matches!(
                error,
                ConfigError::InvalidEnvOverride { ref key, .. } if key == "PRICEWISE_SIMULATION_SEED"
            );
            ensure(names_variable, "error should name the offending variable")
        })();

        clear_vars(&["PRICEWISE_SIMULATION_SEED"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRICEWISE_PRICING_COMPETITOR_SAMPLE_SIZE", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message)
                    if message.contains("pricing.competitor_sample_size")
            );
            ensure(has_message, "validation failure should mention pricing.competitor_sample_size")
        })();

        clear_vars(&["PRICEWISE_PRICING_COMPETITOR_SAMPLE_SIZE"]);
        result
    }

    #[test]
    fn missing_required_file_is_an_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = AppConfig::load(LoadOptions {
            config_path: Some("/nonexistent/pricewise.toml".into()),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "missing required file should fail",
        )
    }
}
