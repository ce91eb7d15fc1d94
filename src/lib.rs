// App-specific modules
pub mod api;
pub mod cache;
pub mod config;
pub mod scan;
pub mod tokens;
pub mod utils;
pub mod valuation;
pub mod wallet;
