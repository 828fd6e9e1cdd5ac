pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod process;
pub mod schema;
pub mod sources;
