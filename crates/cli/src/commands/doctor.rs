use pricewise_core::config::{AppConfig, LoadOptions};
use pricewise_core::demand::LinearDemandModel;
use pricewise_core::store::MarketStore;
use pricewise_db::{connect_with_settings, is_in_memory, migrations, DbPool, SqlMarketStore};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DATABASE_CHECKS: [&str; 3] = ["database_connectivity", "schema_migrations", "catalog_seeded"];

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_demand_model(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("demand_model", "configuration did not load"));
            checks.extend(
                DATABASE_CHECKS.iter().map(|name| skipped(name, "configuration did not load")),
            );
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
}

/// A missing or broken weights file is not fatal: the statistical model takes over.
fn check_demand_model(config: &AppConfig) -> DoctorCheck {
    let details = match config.demand.model_path.as_deref() {
        None => "no model path configured; statistical model in use".to_string(),
        Some(path) => match LinearDemandModel::load(path) {
            Ok(model) => {
                format!("linear model `{}` loaded from `{}`", model.version, path.display())
            }
            Err(error) => format!("statistical fallback in use: {error}"),
        },
    };
    DoctorCheck { name: "demand_model", status: CheckStatus::Pass, details }
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                skipped("schema_migrations", "the async runtime did not start"),
                skipped("catalog_seeded", "the async runtime did not start"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck {
                        name: "database_connectivity",
                        status: CheckStatus::Fail,
                        details: format!("failed to connect to database: {error}"),
                    },
                    skipped("schema_migrations", "the database is unreachable"),
                    skipped("catalog_seeded", "the database is unreachable"),
                ];
            }
        };

        let mut checks = vec![DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        }];

        if is_in_memory(&config.database.url) {
            checks.push(skipped("schema_migrations", "in-memory databases start empty"));
            checks.push(skipped("catalog_seeded", "in-memory databases start empty"));
        } else {
            let migrations = check_migrations(&pool).await;
            let migrated = migrations.status == CheckStatus::Pass;
            checks.push(migrations);
            if migrated {
                checks.push(check_catalog(SqlMarketStore::new(pool.clone())).await);
            } else {
                checks.push(skipped("catalog_seeded", "the schema is not up to date"));
            }
        }

        pool.close().await;
        checks
    })
}

async fn check_migrations(pool: &DbPool) -> DoctorCheck {
    let expected = migrations::expected_count();

    match migrations::applied_count(pool).await {
        Ok(applied) if applied >= expected => DoctorCheck {
            name: "schema_migrations",
            status: CheckStatus::Pass,
            details: format!("{applied} of {expected} migrations applied"),
        },
        Ok(applied) => DoctorCheck {
            name: "schema_migrations",
            status: CheckStatus::Fail,
            details: format!("{applied} of {expected} migrations applied; run `pricewise migrate`"),
        },
        Err(error) => DoctorCheck {
            name: "schema_migrations",
            status: CheckStatus::Fail,
            details: format!("could not read migration state: {error}"),
        },
    }
}

async fn check_catalog(store: SqlMarketStore) -> DoctorCheck {
    match store.count_products().await {
        Ok(0) => DoctorCheck {
            name: "catalog_seeded",
            status: CheckStatus::Fail,
            details: "product catalog is empty; run `pricewise seed`".to_string(),
        },
        Ok(count) => DoctorCheck {
            name: "catalog_seeded",
            status: CheckStatus::Pass,
            details: format!("{count} products in catalog"),
        },
        Err(error) => DoctorCheck {
            name: "catalog_seeded",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
