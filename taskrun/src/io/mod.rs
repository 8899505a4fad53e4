pub mod bridge;
pub mod config;
pub mod help;
pub mod process;
pub mod workspace_store;
