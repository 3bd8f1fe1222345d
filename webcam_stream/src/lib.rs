mod routes;
mod server;

pub mod app;
pub mod bounding_box;
pub mod camera;
pub mod cli;
pub mod config;
pub mod context;
pub mod cv_utils;
pub mod detection;
pub mod overlay;
pub mod pipeline;
pub mod stream;
pub mod telemetry;

pub use app::start_app;
