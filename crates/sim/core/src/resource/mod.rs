//! Resource accounting: the regenerating primary resource and the bounded
//! point counter.

mod ledger;
mod points;

pub use ledger::{ResourceLedger, SpendReceipt};
pub use points::PointCounter;
