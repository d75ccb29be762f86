use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use pricewise_core::domain::market::{
    CompetitorObservation, InteractionRecord, InteractionSummary, InteractionType,
    PriceHistoryRecord, SaleOutcome, SaleRecord, SalesSummary,
};
use pricewise_core::domain::product::{Product, ProductId};
use pricewise_core::store::{MarketStore, StoreError};

use crate::DbPool;

const PRODUCT_COLUMNS: &str = "id, name, category, base_cost, current_price, stock_level,
     initial_stock, min_price, max_price, min_margin_percent";

/// SQLite-backed market store. Paired writes (stock + sale, price + history)
/// run inside a single transaction.
#[derive(Clone)]
pub struct SqlMarketStore {
    pool: DbPool,
}

impl SqlMarketStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn db_error(error: sqlx::Error) -> StoreError {
    StoreError::Persistence(error.to_string())
}

/// Foreign key failures on history tables mean the product row is missing.
fn write_error(product_id: &ProductId, error: sqlx::Error) -> StoreError {
    let missing_parent =
        error.as_database_error().is_some_and(|db_error| db_error.is_foreign_key_violation());
    if missing_parent {
        StoreError::ProductNotFound(product_id.clone())
    } else {
        db_error(error)
    }
}

fn decode_error(error: sqlx::Error) -> StoreError {
    StoreError::Decode(error.to_string())
}

fn to_millis(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_millis()
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::Decode(format!("timestamp out of range: {millis}")))
}

fn to_count(value: i64, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value)
        .map_err(|_| StoreError::Decode(format!("{column} out of range: {value}")))
}

fn product_from_row(row: &SqliteRow) -> Result<Product, StoreError> {
    let stock_level: i64 = row.try_get("stock_level").map_err(decode_error)?;
    let initial_stock: i64 = row.try_get("initial_stock").map_err(decode_error)?;

    Ok(Product {
        id: ProductId(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        category: row.try_get("category").map_err(decode_error)?,
        base_cost: row.try_get("base_cost").map_err(decode_error)?,
        current_price: row.try_get("current_price").map_err(decode_error)?,
        stock_level: to_count(stock_level, "stock_level")?,
        initial_stock: to_count(initial_stock, "initial_stock")?,
        min_price: row.try_get("min_price").map_err(decode_error)?,
        max_price: row.try_get("max_price").map_err(decode_error)?,
        min_margin_percent: row.try_get("min_margin_percent").map_err(decode_error)?,
    })
}

fn price_history_from_row(row: &SqliteRow) -> Result<PriceHistoryRecord, StoreError> {
    let stock_level: i64 = row.try_get("stock_level").map_err(decode_error)?;
    let recorded_at: i64 = row.try_get("recorded_at").map_err(decode_error)?;

    Ok(PriceHistoryRecord {
        product_id: ProductId(row.try_get("product_id").map_err(decode_error)?),
        old_price: row.try_get("old_price").map_err(decode_error)?,
        new_price: row.try_get("new_price").map_err(decode_error)?,
        reason: row.try_get("reason").map_err(decode_error)?,
        demand_score: row.try_get("demand_score").map_err(decode_error)?,
        competitor_avg: row.try_get("competitor_avg").map_err(decode_error)?,
        stock_level: to_count(stock_level, "stock_level")?,
        timestamp: from_millis(recorded_at)?,
    })
}

#[async_trait]
impl MarketStore for SqlMarketStore {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM product ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.iter().map(product_from_row).collect()
    }

    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn count_products(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(count.max(0) as u64)
    }

    async fn insert_product(&self, product: Product) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO product (id, name, category, base_cost, current_price, stock_level,
                                  initial_stock, min_price, max_price, min_margin_percent)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.base_cost)
        .bind(product.current_price)
        .bind(i64::from(product.stock_level))
        .bind(i64::from(product.initial_stock))
        .bind(product.min_price)
        .bind(product.max_price)
        .bind(product.min_margin_percent)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn record_interaction(&self, interaction: InteractionRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO customer_interaction (product_id, interaction_type, session_id,
                                               price_at_interaction, recorded_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(interaction.product_id.as_str())
        .bind(interaction.interaction_type.as_str())
        .bind(&interaction.session_id)
        .bind(interaction.price_at_interaction)
        .bind(to_millis(interaction.timestamp))
        .execute(&self.pool)
        .await
        .map_err(|error| write_error(&interaction.product_id, error))?;

        Ok(())
    }

    async fn record_sale(&self, sale: SaleRecord) -> Result<SaleOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let decremented = sqlx::query(
            "UPDATE product SET stock_level = stock_level - ?
             WHERE id = ? AND stock_level >= ?",
        )
        .bind(i64::from(sale.quantity))
        .bind(sale.product_id.as_str())
        .bind(i64::from(sale.quantity))
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if decremented.rows_affected() == 0 {
            let available: Option<i64> =
                sqlx::query_scalar("SELECT stock_level FROM product WHERE id = ?")
                    .bind(sale.product_id.as_str())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_error)?;
            tx.rollback().await.map_err(db_error)?;

            return match available {
                Some(available) => Ok(SaleOutcome::InsufficientStock {
                    available: to_count(available, "stock_level")?,
                }),
                None => Err(StoreError::ProductNotFound(sale.product_id)),
            };
        }

        sqlx::query(
            "INSERT INTO sale (product_id, quantity, price, revenue, profit, recorded_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(sale.product_id.as_str())
        .bind(i64::from(sale.quantity))
        .bind(sale.price)
        .bind(sale.revenue)
        .bind(sale.profit)
        .bind(to_millis(sale.timestamp))
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        let remaining: i64 = sqlx::query_scalar("SELECT stock_level FROM product WHERE id = ?")
            .bind(sale.product_id.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(SaleOutcome::Recorded { remaining_stock: to_count(remaining, "stock_level")? })
    }

    async fn record_competitor_price(
        &self,
        observation: CompetitorObservation,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO competitor_price (product_id, competitor_name, price, recorded_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(observation.product_id.as_str())
        .bind(&observation.competitor_name)
        .bind(observation.price)
        .bind(to_millis(observation.timestamp))
        .execute(&self.pool)
        .await
        .map_err(|error| write_error(&observation.product_id, error))?;

        Ok(())
    }

    async fn apply_price_change(&self, change: PriceHistoryRecord) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let updated = sqlx::query("UPDATE product SET current_price = ? WHERE id = ?")
            .bind(change.new_price)
            .bind(change.product_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(db_error)?;
            return Err(StoreError::ProductNotFound(change.product_id));
        }

        sqlx::query(
            "INSERT INTO price_history (product_id, old_price, new_price, reason, demand_score,
                                        competitor_avg, stock_level, recorded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(change.product_id.as_str())
        .bind(change.old_price)
        .bind(change.new_price)
        .bind(&change.reason)
        .bind(change.demand_score)
        .bind(change.competitor_avg)
        .bind(i64::from(change.stock_level))
        .bind(to_millis(change.timestamp))
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn price_history(
        &self,
        id: &ProductId,
        limit: usize,
    ) -> Result<Vec<PriceHistoryRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT product_id, old_price, new_price, reason, demand_score, competitor_avg,
                    stock_level, recorded_at
             FROM price_history
             WHERE product_id = ?
             ORDER BY recorded_at DESC, id DESC
             LIMIT ?",
        )
        .bind(id.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(price_history_from_row).collect()
    }

    async fn recent_competitor_average(
        &self,
        id: &ProductId,
        limit: usize,
    ) -> Result<Option<f64>, StoreError> {
        sqlx::query_scalar(
            "SELECT AVG(price) FROM (
                 SELECT price FROM competitor_price
                 WHERE product_id = ?
                 ORDER BY recorded_at DESC, id DESC
                 LIMIT ?
             )",
        )
        .bind(id.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn competitor_average(
        &self,
        id: &ProductId,
        since: DateTime<Utc>,
    ) -> Result<Option<f64>, StoreError> {
        sqlx::query_scalar(
            "SELECT AVG(price) FROM competitor_price WHERE product_id = ? AND recorded_at > ?",
        )
        .bind(id.as_str())
        .bind(to_millis(since))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn interaction_summary(
        &self,
        id: Option<&ProductId>,
        since: DateTime<Utc>,
    ) -> Result<InteractionSummary, StoreError> {
        let rows = sqlx::query(
            "SELECT interaction_type, COUNT(*) AS count
             FROM customer_interaction
             WHERE (?1 IS NULL OR product_id = ?1) AND recorded_at > ?2
             GROUP BY interaction_type",
        )
        .bind(id.map(ProductId::as_str))
        .bind(to_millis(since))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut summary = InteractionSummary::default();
        for row in &rows {
            let kind: String = row.try_get("interaction_type").map_err(decode_error)?;
            let count: i64 = row.try_get("count").map_err(decode_error)?;
            let kind = kind
                .parse::<InteractionType>()
                .map_err(|error| StoreError::Decode(error.to_string()))?;
            summary.add(kind, to_count(count, "interaction count")?);
        }
        Ok(summary)
    }

    async fn sales_summary(
        &self,
        id: Option<&ProductId>,
        since: DateTime<Utc>,
    ) -> Result<SalesSummary, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS sale_count,
                    COALESCE(SUM(quantity), 0) AS units,
                    COALESCE(SUM(revenue), 0.0) AS revenue,
                    COALESCE(SUM(profit), 0.0) AS profit
             FROM sale
             WHERE (?1 IS NULL OR product_id = ?1) AND recorded_at > ?2",
        )
        .bind(id.map(ProductId::as_str))
        .bind(to_millis(since))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        let sale_count: i64 = row.try_get("sale_count").map_err(decode_error)?;
        let units: i64 = row.try_get("units").map_err(decode_error)?;
        Ok(SalesSummary {
            sale_count: sale_count.max(0) as u64,
            units: units.max(0) as u64,
            revenue: row.try_get("revenue").map_err(decode_error)?,
            profit: row.try_get("profit").map_err(decode_error)?,
        })
    }

    async fn price_change_count(&self, since: DateTime<Utc>) -> Result<u64, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM price_history WHERE recorded_at > ?")
                .bind(to_millis(since))
                .fetch_one(&self.pool)
                .await
                .map_err(db_error)?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use pricewise_core::domain::market::{
        CompetitorObservation, InteractionRecord, InteractionType, PriceHistoryRecord,
        SaleOutcome, SaleRecord,
    };
    use pricewise_core::domain::product::{Product, ProductId};
    use pricewise_core::store::{MarketStore, StoreError};

    use super::SqlMarketStore;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlMarketStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlMarketStore::new(pool)
    }

    fn product(id: &str, stock: u32) -> Product {
        Product {
            id: ProductId(id.to_string()),
            name: "Smart Watch Series X".to_string(),
            category: "Electronics".to_string(),
            base_cost: 120.0,
            current_price: 249.99,
            stock_level: stock,
            initial_stock: 80,
            min_price: 144.0,
            max_price: 374.985,
            min_margin_percent: 20.0,
        }
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, minute, 0).single().expect("valid timestamp")
    }

    fn observation(id: &str, price: f64, minute: u32) -> CompetitorObservation {
        CompetitorObservation {
            product_id: ProductId(id.to_string()),
            competitor_name: "PriceKing".to_string(),
            price,
            timestamp: at(minute),
        }
    }

    #[tokio::test]
    async fn insert_and_find_product_round_trips_every_column() {
        let store = setup().await;
        store.insert_product(product("prod-002", 80)).await.expect("insert");

        let found = store
            .find_product(&ProductId("prod-002".to_string()))
            .await
            .expect("find")
            .expect("product exists");

        assert_eq!(found, product("prod-002", 80));
        assert_eq!(store.count_products().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn duplicate_product_insert_is_a_persistence_error() {
        let store = setup().await;
        store.insert_product(product("prod-002", 80)).await.expect("insert");

        let error = store.insert_product(product("prod-002", 80)).await.expect_err("duplicate");

        assert!(matches!(error, StoreError::Persistence(_)));
    }

    #[tokio::test]
    async fn record_sale_decrements_stock_in_the_same_transaction() {
        let store = setup().await;
        let listed = product("prod-002", 5);
        store.insert_product(listed.clone()).await.expect("insert");

        let outcome = store
            .record_sale(SaleRecord::at_current_price(&listed, 3, at(1)))
            .await
            .expect("record sale");
        assert_eq!(outcome, SaleOutcome::Recorded { remaining_stock: 2 });

        let refused = store
            .record_sale(SaleRecord::at_current_price(&listed, 3, at(2)))
            .await
            .expect("record sale");
        assert_eq!(refused, SaleOutcome::InsufficientStock { available: 2 });

        let summary = store.sales_summary(None, at(0)).await.expect("sales summary");
        assert_eq!(summary.sale_count, 1);
        assert_eq!(summary.units, 3);
        assert!((summary.revenue - 749.97).abs() < 1e-9);
    }

    #[tokio::test]
    async fn record_sale_for_unknown_product_is_not_found() {
        let store = setup().await;
        let ghost = product("prod-404", 5);

        let error = store
            .record_sale(SaleRecord::at_current_price(&ghost, 1, at(1)))
            .await
            .expect_err("unknown product");

        assert!(matches!(error, StoreError::ProductNotFound(id) if id.0 == "prod-404"));
    }

    #[tokio::test]
    async fn interaction_for_unknown_product_is_not_found() {
        let store = setup().await;

        let error = store
            .record_interaction(InteractionRecord {
                product_id: ProductId("prod-404".to_string()),
                interaction_type: InteractionType::View,
                session_id: "session-1".to_string(),
                price_at_interaction: 10.0,
                timestamp: at(1),
            })
            .await
            .expect_err("unknown product");

        assert!(matches!(error, StoreError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn price_change_updates_product_and_appends_history() {
        let store = setup().await;
        store.insert_product(product("prod-002", 80)).await.expect("insert");
        let id = ProductId("prod-002".to_string());

        for (minute, new_price) in [(1, 259.99), (2, 239.5)] {
            store
                .apply_price_change(PriceHistoryRecord {
                    product_id: id.clone(),
                    old_price: 249.99,
                    new_price,
                    reason: "Demand-based optimization".to_string(),
                    demand_score: 61.2,
                    competitor_avg: 245.0,
                    stock_level: 80,
                    timestamp: at(minute),
                })
                .await
                .expect("apply change");
        }

        let current = store.get_product(&id).await.expect("product");
        assert_eq!(current.current_price, 239.5);

        let history = store.price_history(&id, 10).await.expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].new_price, 239.5, "most recent first");
        assert_eq!(history[0].timestamp, at(2));
        assert_eq!(store.price_change_count(at(1)).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn price_change_for_unknown_product_writes_nothing() {
        let store = setup().await;

        let error = store
            .apply_price_change(PriceHistoryRecord {
                product_id: ProductId("prod-404".to_string()),
                old_price: 1.0,
                new_price: 2.0,
                reason: "Demand-based optimization".to_string(),
                demand_score: 50.0,
                competitor_avg: 0.0,
                stock_level: 1,
                timestamp: at(1),
            })
            .await
            .expect_err("unknown product");

        assert!(matches!(error, StoreError::ProductNotFound(_)));
        assert_eq!(store.price_change_count(at(0)).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn recent_competitor_average_uses_latest_observations_only() {
        let store = setup().await;
        store.insert_product(product("prod-002", 80)).await.expect("insert");
        let id = ProductId("prod-002".to_string());

        for (minute, price) in [(1, 100.0), (2, 200.0), (3, 300.0)] {
            store
                .record_competitor_price(observation("prod-002", price, minute))
                .await
                .expect("observe");
        }

        let latest_two = store.recent_competitor_average(&id, 2).await.expect("average");
        assert_eq!(latest_two, Some(250.0));

        let windowed = store.competitor_average(&id, at(1)).await.expect("windowed");
        assert_eq!(windowed, Some(250.0), "window is strictly after `since`");

        let none = store
            .recent_competitor_average(&ProductId("prod-003".to_string()), 15)
            .await
            .expect("average");
        assert_eq!(none, None);
    }

    #[tokio::test]
    async fn interaction_summary_groups_by_type_and_product() {
        let store = setup().await;
        store.insert_product(product("prod-002", 80)).await.expect("insert");
        store.insert_product(product("prod-003", 80)).await.expect("insert");

        let interactions = [
            ("prod-002", InteractionType::View, 1),
            ("prod-002", InteractionType::View, 2),
            ("prod-002", InteractionType::CartAdd, 3),
            ("prod-002", InteractionType::Bounce, 4),
            ("prod-003", InteractionType::View, 5),
            ("prod-002", InteractionType::View, 0),
        ];
        for (id, kind, minute) in interactions {
            store
                .record_interaction(InteractionRecord {
                    product_id: ProductId(id.to_string()),
                    interaction_type: kind,
                    session_id: format!("session-{minute}"),
                    price_at_interaction: 249.99,
                    timestamp: at(minute),
                })
                .await
                .expect("record interaction");
        }

        let id = ProductId("prod-002".to_string());
        let scoped = store.interaction_summary(Some(&id), at(0)).await.expect("summary");
        assert_eq!((scoped.views, scoped.cart_adds, scoped.bounces), (2, 1, 1));

        let all = store.interaction_summary(None, at(0)).await.expect("summary");
        assert_eq!(all.total(), 5);
    }
}
