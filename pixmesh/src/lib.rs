pub mod config;
pub mod filter;
pub mod formats;
pub mod job;
pub mod mesh;
pub mod model;
pub mod pipeline;
pub mod raster;
pub mod rig;
pub mod texture;

pub use config::{ApiConfig, ConfigError, Endpoint};
pub use pipeline::{Pipeline, PipelineError};

pub const HANDLER_PROTOCOL_VERSION: &str = "v2";
