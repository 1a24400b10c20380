pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod routes;

pub use handlers::{configure, AppState};
