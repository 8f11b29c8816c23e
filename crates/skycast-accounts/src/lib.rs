//! Username/password accounts backed by SQLite.

pub mod error;
pub mod password;
pub mod store;

pub use error::{AccountError, AccountResult};
pub use store::AccountStore;
