use thiserror::Error;

use crate::domain::product::ProductId;
use crate::store::StoreError;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("price {price} for product {product_id} is outside [{min_price}, {max_price}]")]
    PriceOutOfBounds { product_id: ProductId, price: f64, min_price: f64, max_price: f64 },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Stable machine-readable class used by operator tooling.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain_validation",
            Self::Store(StoreError::ProductNotFound(_)) => "not_found",
            Self::Store(_) => "persistence",
            Self::Configuration(_) => "config_validation",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::product::ProductId;
    use crate::errors::{ApplicationError, DomainError};
    use crate::store::StoreError;

    #[test]
    fn domain_error_maps_to_domain_validation_class() {
        let error = ApplicationError::from(DomainError::InvariantViolation(
            "product id cannot be empty".to_owned(),
        ));

        assert_eq!(error.error_class(), "domain_validation");
    }

    #[test]
    fn missing_product_maps_to_not_found_class() {
        let error = ApplicationError::from(StoreError::ProductNotFound(ProductId(
            "prod-404".to_owned(),
        )));

        assert_eq!(error.error_class(), "not_found");
        assert_eq!(error.to_string(), "product not found: prod-404");
    }

    #[test]
    fn persistence_error_maps_to_persistence_class() {
        let error = ApplicationError::from(StoreError::Persistence("database is locked".to_owned()));

        assert_eq!(error.error_class(), "persistence");
    }

    #[test]
    fn configuration_error_maps_to_config_class() {
        let error = ApplicationError::Configuration("missing catalog".to_owned());

        assert_eq!(error.error_class(), "config_validation");
    }
}
