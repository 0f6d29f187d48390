pub mod aggregate;
pub mod app;
pub mod camera;
pub mod cli;
pub mod client;
pub mod config;
pub mod fetcher;
pub mod model;
pub mod output;
pub mod render;
pub mod runner;
pub mod selection;
pub mod utils;
pub mod view;

#[cfg(test)]
mod tests;
