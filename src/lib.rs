pub mod app;
pub mod audit;
pub mod authz;
pub mod db;
pub mod errors;
pub mod jwt;
pub mod limiter;
pub mod models;
pub mod routes;
pub mod scoping;
pub mod utils;

// Re-export commonly used items for tests
pub use app::create_app;
