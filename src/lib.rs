pub mod app_error;
pub mod app_state;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod domain;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod otp;
pub mod routes;
pub mod schema;
pub mod swagger;
