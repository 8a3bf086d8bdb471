pub mod accounts;
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod products;
pub mod state;

pub use accounts::services::AccountService;
pub use state::AppState;
