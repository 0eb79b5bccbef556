pub mod api_client;
pub mod app_spec;
pub mod cli;
pub mod commands;
pub mod config;
pub mod display;
pub mod errors;
pub mod models;
pub mod watcher;

#[cfg(test)]
mod tests;
