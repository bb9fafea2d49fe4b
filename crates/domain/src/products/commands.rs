use serde::{Deserialize, Serialize};

use super::aggregate::StockOperation;

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub enum Command {
    /// Register a catalog entry with its opening stock level
    Create {
        id: String,
        name: String,
        price_cents: u64,
        stock_quantity: u32,
        prescription_required: bool,
    },

    /// Apply a stock delta; SUBTRACT below zero is rejected
    AdjustStock {
        quantity: u32,
        operation: StockOperation,
    },
}
