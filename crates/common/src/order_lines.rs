use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::OrderLinesError;

/// The products and amounts requested by a single purchase.
///
/// Keys are product names and are unique; adding the same product twice sums
/// the amounts. Iteration is in ascending product-name order, so anything
/// derived from a traversal (problem lists, priced positions) is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderLines {
    lines: BTreeMap<String, i64>,
}

impl OrderLines {
    /// Creates an empty set of order lines.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds order lines from `(product, amount)` pairs, summing duplicates.
    pub fn from_pairs<I, P>(pairs: I) -> Result<Self, OrderLinesError>
    where
        I: IntoIterator<Item = (P, i64)>,
        P: Into<String>,
    {
        let mut lines = Self::new();
        for (product, amount) in pairs {
            lines.add(product, amount)?;
        }
        Ok(lines)
    }

    /// Adds `amount` of `product`, summing with any amount already requested.
    pub fn add(&mut self, product: impl Into<String>, amount: i64) -> Result<(), OrderLinesError> {
        let product = product.into();
        if amount < 0 {
            return Err(OrderLinesError::NegativeAmount { product, amount });
        }

        let current = self.lines.get(&product).copied().unwrap_or(0);
        let total = current
            .checked_add(amount)
            .ok_or_else(|| OrderLinesError::AmountOverflow {
                product: product.clone(),
            })?;
        self.lines.insert(product, total);
        Ok(())
    }

    /// Returns the requested amount for a product, if present.
    pub fn get(&self, product: &str) -> Option<i64> {
        self.lines.get(product).copied()
    }

    /// Iterates `(product, amount)` in ascending product order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.lines.iter().map(|(name, amount)| (name.as_str(), *amount))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
