pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{BoundaryArgs, CliConfig, Dataset, SchoolDistrictArgs};

pub use app::pipelines::{BoundaryPipeline, SchoolDistrictPipeline};
pub use config::cli::LocalStorage;
pub use core::etl::EtlEngine;
pub use utils::error::{EtlError, Result};
