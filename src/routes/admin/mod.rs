pub mod handler;

pub use handler::{cache_clear, cache_stats};
