pub mod aggregate;
pub mod cache;
pub mod config;
pub mod costs;
pub mod error;
pub mod extract;
pub mod insight;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod reconcile;
pub mod report;

pub use error::{LedgerError, Result};
