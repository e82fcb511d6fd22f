// storefront/src/services/mod.rs

pub mod auth_service;
pub mod inventory_tool;
pub mod mailer;
pub mod payment_gateway;
pub mod sessions;
