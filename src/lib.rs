pub mod api;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod observability;
pub mod state;
pub mod store;
