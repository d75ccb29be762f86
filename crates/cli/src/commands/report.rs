use chrono::Utc;
use pricewise_core::analytics::DashboardSnapshot;
use pricewise_db::SqlMarketStore;

use crate::commands::{build_runtime, load_config, open_database, CommandResult};

/// Prints the dashboard snapshot as pretty JSON.
pub fn run() -> CommandResult {
    let config = match load_config("report") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("report") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let store = SqlMarketStore::new(pool.clone());
        let snapshot = DashboardSnapshot::collect(&store, Utc::now())
            .await
            .map_err(|error| ("report_query", error.to_string(), 6u8));
        pool.close().await;
        snapshot
    });

    match result {
        Ok(snapshot) => match serde_json::to_string_pretty(&snapshot) {
            Ok(output) => CommandResult { exit_code: 0, output },
            Err(error) => CommandResult::failure("report", "serialization", error.to_string(), 1),
        },
        Err(failure) => CommandResult::from_failure("report", failure),
    }
}
