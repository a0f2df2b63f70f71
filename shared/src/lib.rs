pub mod error;
pub mod models;
pub mod validation;
pub mod user_info;
pub mod contest_logic;
pub mod phase;
pub mod eligibility;
pub mod snapshot;

pub use error::{Error, ErrorCode, ContestError, UploadError};
pub use models::*;
pub use validation::*;
pub use user_info::*;
pub use contest_logic::{compute_results, leading_tie, tally, total_votes};
pub use phase::PhaseCommand;
pub use snapshot::{ContestView, Feed, Msg};

#[cfg(test)]
mod tests;
