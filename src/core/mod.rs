pub mod config;
pub mod pipeline;
pub mod progress;
pub mod summary;

pub use config::{RenderSettings, RunConfig};
pub use pipeline::run;
