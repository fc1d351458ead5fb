//! Tracing setup with a reloadable filter: the server boots with a
//! conservative default and switches to the configured filter once
//! settings are parsed.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
