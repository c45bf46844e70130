pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod models;
pub mod readiness;
pub mod routes;
pub mod state;
