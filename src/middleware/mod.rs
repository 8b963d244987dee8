mod error_handler;
mod throttle;

pub use error_handler::log_errors;
pub use throttle::{EndpointGate, throttle};
