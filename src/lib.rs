pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod layout;
pub mod ncbi;
pub mod output;
pub mod status;
