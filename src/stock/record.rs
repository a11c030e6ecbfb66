use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DecreaseError;

/// Identity of a stock row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockId(pub u64);

impl fmt::Display for StockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StockId {
    fn from(id: u64) -> Self {
        StockId(id)
    }
}

/// A snapshot of a stock row as read from a [`CounterStore`](crate::CounterStore).
///
/// `version` increases by exactly one on every committed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub id: StockId,
    pub quantity: u64,
    pub version: u64,
}

impl StockRecord {
    /// Quantity left after removing `quantity`, or `InsufficientStock`.
    pub fn remaining_after(&self, quantity: u64) -> Result<u64, DecreaseError> {
        self.quantity
            .checked_sub(quantity)
            .ok_or_else(|| DecreaseError::InsufficientStock {
                id: self.id,
                available: self.quantity,
                requested: quantity,
            })
    }
}

/// An amount to take out of one stock row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecreaseRequest {
    id: StockId,
    quantity: u64,
}

impl DecreaseRequest {
    /// Rejects a zero quantity.
    pub fn new(id: impl Into<StockId>, quantity: u64) -> Result<Self, DecreaseError> {
        let id = id.into();
        if quantity == 0 {
            return Err(DecreaseError::InvalidQuantity { id });
        }
        Ok(DecreaseRequest { id, quantity })
    }

    pub fn id(&self) -> StockId {
        self.id
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    /// Named lock key for this request's row.
    pub fn lock_key(&self) -> String {
        self.id.to_string()
    }
}
