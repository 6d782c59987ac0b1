// Re-export all public modules so they can be used from main.rs
pub mod config;
pub mod logging;
pub mod ui;

pub mod assets;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;
