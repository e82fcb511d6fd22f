// storefront/src/catalog/mod.rs

pub mod filter;
pub mod seed;

pub use filter::{ProductFilter, ProductSort};
pub use seed::{load_seed_file, seed_catalog, SeedReport};
