pub mod adb;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod devices;
pub mod error;
pub mod lock;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod reboot;
pub mod state;
pub mod strategies;
