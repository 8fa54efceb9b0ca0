pub mod cleaners;
pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod exit;
pub mod logs;
pub mod platform;
pub mod registry;
pub mod tui;
pub mod ui;
