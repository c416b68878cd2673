//! ## Logging Configuration
//!
//! This module sets up logging automatically at program startup using the `ctor` crate.
//! Logging behavior is controlled by the `DEBUG_PIEZO_FEATURES` environment variable:
//!
//! - **Disabled** (default): If the variable is unset, empty, or explicitly set to `"0"` or `"false"`,
//!   no subscriber is installed and stage events are discarded.
//! - **Enabled**: Any other value installs a `fmt` subscriber with a maximum level of `DEBUG`,
//!   which prints the pipeline's stage events and the per-transformer details.
//!
//! ### Usage Example
//!
//! ```sh
//! export DEBUG_PIEZO_FEATURES=true
//! ```

use ctor::ctor;
use tracing::Level;

/// Name of the environment variable that turns debug logging on.
pub const DEBUG_ENV_VAR: &str = "DEBUG_PIEZO_FEATURES";

/// Returns true if the given value of [`DEBUG_ENV_VAR`] enables logging.
pub fn logging_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !(v == "0" || v == "false" || v.is_empty()))
}

#[ctor]
fn set_debug_level() {
    let value = std::env::var(DEBUG_ENV_VAR).ok();
    if logging_enabled(value.as_deref()) {
        // A host application may already have installed its own subscriber.
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .try_init();
    }
}
