//! Verdict and customer-facing reply types.

use serde::{Deserialize, Serialize};
use store::Product;

use crate::error::{PurchaseError, Result};

/// Outcome of stock validation, broadcast by value to every other consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    /// True when every line can be served from stock.
    pub confirmed: bool,
    /// One message per line whose requested amount exceeds stock.
    pub problems: Vec<String>,
}

impl Verdict {
    /// Builds a verdict from the collected problems.
    pub fn from_problems(problems: Vec<String>) -> Self {
        Self {
            confirmed: problems.is_empty(),
            problems,
        }
    }

    /// Message recorded for a line that cannot be served.
    pub fn shortage(product: &str, requested: i64, in_stock: i64) -> String {
        format!("product: {product}, requested_amount: {requested}, actually amount: {in_stock}")
    }
}

/// One priced position of the reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product: String,
    pub pos_cost: i64,
    pub req_amount: i64,
}

/// The priced outcome returned to the customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalReply {
    pub total_cost: i64,
    pub positions: Vec<PricedLine>,
    pub is_confirmed: bool,
    #[serde(rename = "error")]
    pub problems: Vec<String>,
}

impl FinalReply {
    /// Starts an empty reply carrying the verdict's outcome.
    pub fn from_verdict(verdict: Verdict) -> Self {
        Self {
            total_cost: 0,
            positions: Vec::new(),
            is_confirmed: verdict.confirmed,
            problems: verdict.problems,
        }
    }

    /// Prices `req_amount` units of `product` and adds them to the total.
    pub fn add_position(&mut self, product: &Product, req_amount: i64) -> Result<()> {
        let overflow = || PurchaseError::CostOverflow {
            product: product.name.clone(),
        };

        let pos_cost = product.cost.checked_mul(req_amount).ok_or_else(overflow)?;
        self.total_cost = self.total_cost.checked_add(pos_cost).ok_or_else(overflow)?;
        self.positions.push(PricedLine {
            product: product.name.clone(),
            pos_cost,
            req_amount,
        });
        Ok(())
    }

    /// Encodes the reply as JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use store::ProductId;

    use super::*;

    fn product(name: &str, cost: i64) -> Product {
        Product {
            id: ProductId::new(1),
            name: name.to_string(),
            cost,
            amount: 100,
        }
    }

    #[test]
    fn verdict_without_problems_is_confirmed() {
        assert!(Verdict::from_problems(vec![]).confirmed);
        assert!(!Verdict::from_problems(vec!["x".into()]).confirmed);
    }

    #[test]
    fn shortage_message_format() {
        assert_eq!(
            Verdict::shortage("apple", 200, 50),
            "product: apple, requested_amount: 200, actually amount: 50"
        );
    }

    #[test]
    fn reply_wire_format() {
        let mut reply = FinalReply::from_verdict(Verdict::from_problems(vec![]));
        reply.add_position(&product("apple", 200), 10).unwrap();
        reply.add_position(&product("melon", 200), 1).unwrap();

        let json = String::from_utf8(reply.to_bytes().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"total_cost":2200,"positions":[{"product":"apple","pos_cost":2000,"req_amount":10},{"product":"melon","pos_cost":200,"req_amount":1}],"is_confirmed":true,"error":[]}"#
        );
    }

    #[test]
    fn cost_overflow_is_reported() {
        let mut reply = FinalReply::default();
        let err = reply
            .add_position(&product("gold", i64::MAX), 2)
            .unwrap_err();
        assert!(matches!(err, PurchaseError::CostOverflow { ref product } if product == "gold"));
        assert!(reply.positions.is_empty());
    }
}
