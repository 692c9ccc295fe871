pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod enrich;
pub mod guard;
pub mod jobs;
pub mod logging;
pub mod scraper;
pub mod services;
pub mod state;
pub mod utils;
pub mod view;
pub mod web;

#[cfg(test)]
mod testing;
