//! Account flows: registration, login, password reset and credential change.
mod error;
pub mod ledger;
mod service;

pub use error::AccountError;
pub use ledger::ResetTokenLedger;
pub use service::*;
