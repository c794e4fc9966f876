pub mod audit;
pub mod auth;
pub mod compliance;
pub mod config;
pub mod db;
pub mod error;
pub mod field_schema;
pub mod field_values;
pub mod folders;
pub mod lifecycle;
pub mod models;
pub mod policy;
pub mod registry;
pub mod routes;
pub mod schema;
pub mod state;
pub mod utils;
