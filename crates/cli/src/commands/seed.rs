use pricewise_db::{CatalogSeed, SqlMarketStore};

use crate::commands::{build_runtime, load_config, open_database, CommandFailure, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let store = SqlMarketStore::new(pool.clone());

        let outcome = async {
            let seeded = CatalogSeed::load(&store)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
            let verification = CatalogSeed::verify(&store)
                .await
                .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

            if !verification.all_present {
                let failed = failed_checks(&verification.checks);
                return Err(("seed_verification", verification_message(&failed), 6u8));
            }
            Ok::<_, CommandFailure>(seeded)
        }
        .await;

        pool.close().await;
        outcome
    });

    match result {
        Ok(seeded) if seeded.already_seeded => {
            CommandResult::success("seed", "catalog already present; nothing inserted")
        }
        Ok(seeded) => CommandResult::success(
            "seed",
            format!("starter catalog loaded: {} products inserted", seeded.inserted),
        ),
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn failed_checks(checks: &[(String, bool)]) -> Vec<&str> {
    checks.iter().filter_map(|(check, passed)| (!passed).then_some(check.as_str())).collect()
}

fn verification_message(failed: &[&str]) -> String {
    if failed.is_empty() {
        "some catalog rows failed to load".to_string()
    } else {
        format!("catalog verification failed for products: {}", failed.join(", "))
    }
}
