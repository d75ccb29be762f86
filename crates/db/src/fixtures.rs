use pricewise_core::catalog::{seed_catalog, starter_products, STARTER_CATALOG};
use pricewise_core::domain::product::ProductId;
use pricewise_core::errors::ApplicationError;
use pricewise_core::store::{MarketStore, StoreError};
use tracing::warn;

/// The ten-product starter catalog loaded on first boot.
pub struct CatalogSeed;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: usize,
    pub already_seeded: bool,
}

#[derive(Clone, Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}

impl CatalogSeed {
    pub async fn load(store: &dyn MarketStore) -> Result<SeedResult, ApplicationError> {
        let inserted = seed_catalog(store, &starter_products()).await?;
        Ok(SeedResult { inserted, already_seeded: inserted == 0 })
    }

    /// Checks every starter product exists with its derived bounds intact.
    pub async fn verify(store: &dyn MarketStore) -> Result<VerificationResult, StoreError> {
        let mut checks = Vec::with_capacity(STARTER_CATALOG.len());

        for entry in &STARTER_CATALOG {
            let expected = entry.to_product();
            let ok = match store.find_product(&ProductId(entry.id.to_string())).await? {
                Some(found) => {
                    found.name == expected.name
                        && found.category == expected.category
                        && found.base_cost == expected.base_cost
                        && found.initial_stock == expected.initial_stock
                        && found.min_price == expected.min_price
                        && found.max_price == expected.max_price
                        && found.contains_price(found.current_price)
                }
                None => false,
            };
            if !ok {
                warn!(
                    event_name = "db.catalog.verify_failed",
                    product_id = entry.id,
                    "starter product missing or altered"
                );
            }
            checks.push((entry.id.to_string(), ok));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}
