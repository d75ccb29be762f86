use tracing::info;

use crate::domain::product::{Product, ProductId};
use crate::errors::ApplicationError;
use crate::store::MarketStore;

/// One row of the starter catalog, before derived bounds are applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub base_cost: f64,
    pub price: f64,
    pub stock: u32,
    pub min_margin_percent: f64,
}

impl CatalogEntry {
    /// Floor is cost plus the minimum margin, ceiling is 1.5× the list price.
    pub fn to_product(&self) -> Product {
        Product {
            id: ProductId(self.id.to_string()),
            name: self.name.to_string(),
            category: self.category.to_string(),
            base_cost: self.base_cost,
            current_price: self.price,
            stock_level: self.stock,
            initial_stock: self.stock,
            min_price: self.base_cost * (1.0 + self.min_margin_percent / 100.0),
            max_price: self.price * 1.5,
            min_margin_percent: self.min_margin_percent,
        }
    }
}

const fn entry(
    id: &'static str,
    name: &'static str,
    category: &'static str,
    base_cost: f64,
    price: f64,
    stock: u32,
    min_margin_percent: f64,
) -> CatalogEntry {
    CatalogEntry { id, name, category, base_cost, price, stock, min_margin_percent }
}

pub const STARTER_CATALOG: [CatalogEntry; 10] = [
    entry("prod-001", "Wireless Headphones Pro", "Electronics", 50.0, 99.99, 150, 25.0),
    entry("prod-002", "Smart Watch Ultra", "Electronics", 120.0, 249.99, 80, 30.0),
    entry("prod-003", "Laptop Stand Aluminum", "Accessories", 15.0, 39.99, 200, 40.0),
    entry("prod-004", "USB-C Hub 7-in-1", "Accessories", 20.0, 49.99, 120, 35.0),
    entry("prod-005", "Mechanical Keyboard RGB", "Electronics", 60.0, 129.99, 90, 30.0),
    entry("prod-006", "Wireless Mouse Ergonomic", "Accessories", 18.0, 44.99, 180, 35.0),
    entry("prod-007", "4K Webcam Pro", "Electronics", 80.0, 159.99, 60, 28.0),
    entry("prod-008", "Phone Stand Adjustable", "Accessories", 8.0, 24.99, 250, 45.0),
    entry("prod-009", "Portable SSD 1TB", "Electronics", 90.0, 179.99, 70, 25.0),
    entry("prod-010", "Cable Organizer Set", "Accessories", 5.0, 16.99, 300, 50.0),
];

pub fn starter_products() -> Vec<Product> {
    STARTER_CATALOG.iter().map(CatalogEntry::to_product).collect()
}

/// Inserts `products` only when the store holds no products yet.
///
/// Every product is validated before anything is written. Returns how many
/// products were inserted.
pub async fn seed_catalog(
    store: &dyn MarketStore,
    products: &[Product],
) -> Result<usize, ApplicationError> {
    let existing = store.count_products().await?;
    if existing > 0 {
        info!(
            event_name = "catalog.seed.skipped",
            existing_products = existing,
            "catalog already seeded"
        );
        return Ok(0);
    }

    for product in products {
        product.validate()?;
    }
    for product in products {
        store.insert_product(product.clone()).await?;
    }

    info!(event_name = "catalog.seed.completed", inserted = products.len(), "catalog seeded");
    Ok(products.len())
}
