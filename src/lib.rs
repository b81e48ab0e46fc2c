pub mod accounts;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod state;

pub use accounts::{Account, AccountFields, AccountManager, ProfileUpdate, PublicAccount};
pub use error::AccountError;
