// storefront/src/lib.rs

//! Supplement storefront: catalog, carts that follow the user across devices,
//! checkout with invoices, a back office, nutritionist appointments and an
//! inventory tool endpoint for automation agents.

pub mod appointments;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod pricing;
pub mod services;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod web;
