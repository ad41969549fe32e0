pub mod error;

pub mod sim;

pub mod config;
pub mod driver;
pub mod render;
