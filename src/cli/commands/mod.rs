//! Command implementations.

mod ask;
mod chat;
mod config;
mod doctor;
mod eval;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use eval::run_eval;

use crate::cli::Output;
use crate::error::{Result, SvaraError};

/// Commands that talk to the model backends need an API key up front.
pub(crate) fn require_api_key() -> Result<()> {
    if crate::openai::is_api_key_configured() {
        Ok(())
    } else {
        Output::error("OPENAI_API_KEY is not set.");
        Output::info("Export your API key and try again, or run 'svara doctor'.");
        Err(SvaraError::Config("OPENAI_API_KEY is not set".to_string()))
    }
}
