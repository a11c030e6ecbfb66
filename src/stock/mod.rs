mod record;
mod rule;

pub use record::{DecreaseRequest, StockId, StockRecord};
pub use rule::{apply_decrease, WriteMode};
