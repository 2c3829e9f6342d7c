pub mod config;
pub mod derive;
pub mod error;
pub mod models;
pub mod routes;
pub mod storage;
pub mod tracker;
