//! The reduced pricing state.
//!
//! `PricingState` is an immutable value: the engine publishes a fresh
//! instance per applied event and readers hold whatever instance they
//! obtained for as long as they like. The two maps are behind `Arc` so the
//! reducer only clones the map an event actually touches.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Sequence number of the empty state, before any event has been applied.
pub const EMPTY_SEQUENCE: i64 = -1;

/// Fully-reduced pricing configuration as of one sequence number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingState {
    /// Sequence number of the last applied event; [`EMPTY_SEQUENCE`] when no
    /// event has been applied.
    pub as_of_sequence: i64,
    /// Markup rate per product category.
    pub markups: Arc<BTreeMap<String, f64>>,
    /// Display name per brand code.
    pub brands: Arc<BTreeMap<String, String>>,
    /// Fallback markup for categories without an explicit entry.
    pub default_markup: f64,
}

impl PricingState {
    /// Returns the empty state at sequence −1.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            as_of_sequence: EMPTY_SEQUENCE,
            markups: Arc::new(BTreeMap::new()),
            brands: Arc::new(BTreeMap::new()),
            default_markup: 0.0,
        }
    }

    /// Returns the markup rate for a category, falling back to the default.
    #[must_use]
    pub fn markup_for(&self, category: &str) -> f64 {
        self.markups
            .get(category)
            .copied()
            .unwrap_or(self.default_markup)
    }

    /// Returns the display name for a brand code, if known.
    #[must_use]
    pub fn brand_name(&self, code: &str) -> Option<&str> {
        self.brands.get(code).map(String::as_str)
    }
}

impl Default for PricingState {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for PricingState {
    fn eq(&self, other: &Self) -> bool {
        self.as_of_sequence == other.as_of_sequence
            && self.default_markup == other.default_markup
            && *self.markups == *other.markups
            && *self.brands == *other.brands
    }
}
