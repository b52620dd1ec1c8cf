//! Beat-synchronized highlight video stitcher.
//!
//! Wires the planner and the media collaborators into one run:
//! configuration, run logging, the pipeline driver and the CLI.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;

pub use cli::{parse_name_list, prompt_line, Cli};
pub use config::StitchConfig;
pub use error::{PipelineError, PipelineResult};
pub use logging::RunLogger;
pub use pipeline::{StitchPipeline, StitchReport};
