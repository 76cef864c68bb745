//! EMD module - finite-state controller for earnest-money deposits.

mod aggregate;
mod events;
mod status;

pub use aggregate::Emd;
pub use events::EmdEvent;
pub use status::EmdStatus;
