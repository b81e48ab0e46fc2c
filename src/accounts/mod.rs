pub mod dto;
pub mod memory;
mod password;
pub mod principal;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use dto::{AccountFields, ProfileUpdate, PublicAccount};
pub use memory::MemoryAccountRepo;
pub use principal::{AccessFlags, Credentials};
pub use repo::{AccountRepo, PgAccountRepo};
pub use repo_types::Account;
pub use services::{normalize_email, AccountManager};
