pub mod handler;
pub mod model;

pub use handler::machine_listing;
