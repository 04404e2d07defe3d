pub mod catalog;
pub mod config;
pub mod error;
pub mod locator;
pub mod monitor;
pub mod paths;
pub mod protocol;
pub mod rotation;
pub mod scheduler;
pub mod selector;
