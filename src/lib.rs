pub mod auth;
pub mod booking;
pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod scheduling;
pub mod snapshot;
pub mod store;
