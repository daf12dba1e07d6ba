pub mod config;
pub mod error;
pub mod geo;
pub mod mesh;
pub mod pipeline;
pub mod renderer;
pub mod service;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
