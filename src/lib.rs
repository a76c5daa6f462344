pub mod config;
pub mod cycle;
pub mod discovery;
pub mod reddit;
pub mod report;
pub mod store;
pub mod supervisor;
pub mod tracking;
