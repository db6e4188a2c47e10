pub mod errors;
pub mod routes;
pub mod startup;
pub mod state;

pub use startup::{build_app, run, run_with};
