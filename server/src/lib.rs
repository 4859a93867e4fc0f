pub mod cache;
pub mod config;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod service;
pub mod utils;
pub mod weather;
