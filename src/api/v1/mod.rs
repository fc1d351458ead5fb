mod error;
mod gate;
mod handler;
mod router;

pub use error::{ApiError, ApiErrorCode, recover_error};
pub use gate::{GateConfig, PathClass, PathPolicy, RequestGate};
pub use router::routes;
