pub mod handler;
pub mod model;

pub use handler::{usage_report, usage_summary};
