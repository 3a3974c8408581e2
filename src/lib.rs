pub mod automation;
pub mod cli;
pub mod color;
pub mod config;
pub mod desktop;
pub mod error;
pub mod logging;
pub mod sheet;
pub mod templates;
pub mod vision;
