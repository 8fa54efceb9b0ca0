mod cleanup;
mod error;
mod result;

pub use cleanup::{Action, CleanupType};
pub use error::CleanupError;
pub use result::{CleanupResult, RunItem, RunSummary};
