use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::domain::market::InteractionType;
use crate::domain::product::Product;

/// Lowest weight any product gets in traffic and purchase sampling.
pub const MIN_PRODUCT_WEIGHT: f64 = 0.1;

/// Outcome slots and their weights. Views occupy three slots, so they add up
/// to 90 of 120.
pub const INTERACTION_SLOTS: [InteractionType; 6] = [
    InteractionType::View,
    InteractionType::View,
    InteractionType::View,
    InteractionType::CartAdd,
    InteractionType::CartRemove,
    InteractionType::Bounce,
];
pub const INTERACTION_WEIGHTS: [f64; 6] = [40.0, 30.0, 20.0, 15.0, 5.0, 10.0];

const BASE_PURCHASE_PROBABILITY: f64 = 0.15;
const SCARCITY_STOCK_RATIO: f64 = 0.2;
const SCARCITY_URGENCY: f64 = 1.3;
const MAX_PURCHASE_PROBABILITY: f64 = 0.5;
const SINGLE_UNIT_PROBABILITY: f64 = 0.8;
const MAX_COMPETITOR_DEVIATION: f64 = 0.2;

/// Index drawn with probability proportional to its weight. `None` for an
/// empty slice or weights that are all zero, negative, or not finite.
pub fn weighted_index<R: Rng + ?Sized>(rng: &mut R, weights: &[f64]) -> Option<usize> {
    let distribution = WeightedIndex::new(weights).ok()?;
    Some(distribution.sample(rng))
}

pub fn weighted_pick<'a, T, R: Rng + ?Sized>(
    rng: &mut R,
    items: &'a [T],
    weights: &[f64],
) -> Option<&'a T> {
    if items.len() != weights.len() {
        return None;
    }
    weighted_index(rng, weights).map(|index| &items[index])
}

/// Stocked products get more traffic.
pub fn visibility_weight(product: &Product) -> f64 {
    log_stock(product).max(MIN_PRODUCT_WEIGHT)
}

/// Stocked products priced low in their range sell more often.
pub fn purchase_weight(product: &Product) -> f64 {
    let headroom =
        (product.max_price - product.current_price) / (product.max_price - product.min_price + 1.0);
    (log_stock(product) * headroom).max(MIN_PRODUCT_WEIGHT)
}

fn log_stock(product: &Product) -> f64 {
    (f64::from(product.stock_level) + 1.0).ln()
}

pub fn draw_interaction_type<R: Rng + ?Sized>(rng: &mut R) -> InteractionType {
    weighted_pick(rng, &INTERACTION_SLOTS, &INTERACTION_WEIGHTS)
        .copied()
        .unwrap_or(InteractionType::View)
}

/// `0.15 · (1.5 − price position)`, boosted 1.3× when stock is below 20% of
/// its initial level, capped at 0.5.
pub fn purchase_probability(product: &Product) -> f64 {
    let mut probability = BASE_PURCHASE_PROBABILITY * (1.5 - product.price_position());
    if product.stock_ratio() < SCARCITY_STOCK_RATIO {
        probability *= SCARCITY_URGENCY;
    }
    probability.clamp(0.0, MAX_PURCHASE_PROBABILITY)
}

pub fn draw_quantity<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    if rng.gen_bool(SINGLE_UNIT_PROBABILITY) {
        1
    } else {
        rng.gen_range(1..=3)
    }
}

/// Competitor price within ±20% of ours.
pub fn competitor_quote<R: Rng + ?Sized>(rng: &mut R, our_price: f64) -> f64 {
    our_price * (1.0 + rng.gen_range(-MAX_COMPETITOR_DEVIATION..MAX_COMPETITOR_DEVIATION))
}
