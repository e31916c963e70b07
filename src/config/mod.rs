pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::app::pipelines::boundary_pipeline::DEFAULT_PATTERN;
#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::domain::model::OutputFormat;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "govdata-etl")]
#[command(about = "Converts raw government statistics files into unified clean outputs")]
pub struct CliConfig {
    #[command(subcommand)]
    pub dataset: Dataset,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log memory use and timing per phase")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Dataset {
    /// Stack the yearly school district finance spreadsheets into one CSV
    SchoolDistricts(SchoolDistrictArgs),
    /// Merge the per-state school district boundary shapefiles into one shapefile
    Boundaries(BoundaryArgs),
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct SchoolDistrictArgs {
    #[arg(long, default_value = "../data_raw/")]
    pub raw_path: String,

    #[arg(long, default_value = "../data_clean/")]
    pub clean_path: String,

    #[arg(long, default_value = "us_school_districts.csv")]
    pub clean_name: String,

    #[arg(long, value_delimiter = ',', default_value = "csv")]
    pub formats: Vec<String>,

    /// Output columns; defaults to the standard finance survey columns
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct BoundaryArgs {
    #[arg(long, default_value = "../data_raw/unsd_shps/")]
    pub raw_path: String,

    #[arg(long, default_value = "../data_clean/")]
    pub clean_path: String,

    #[arg(long, default_value = DEFAULT_PATTERN)]
    pub pattern: String,

    #[arg(long, default_value = "unsd_compiled.shp")]
    pub output_name: String,
}

#[cfg(feature = "cli")]
impl ConfigProvider for SchoolDistrictArgs {
    fn raw_path(&self) -> &str {
        &self.raw_path
    }

    fn clean_path(&self) -> &str {
        &self.clean_path
    }

    fn output_name(&self) -> &str {
        &self.clean_name
    }

    fn columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn output_formats(&self) -> Vec<OutputFormat> {
        self.formats
            .iter()
            .filter_map(|f| OutputFormat::parse(f))
            .collect()
    }
}

#[cfg(feature = "cli")]
impl Validate for SchoolDistrictArgs {
    fn validate(&self) -> Result<()> {
        validation::validate_path("raw_path", &self.raw_path)?;
        validation::validate_path("clean_path", &self.clean_path)?;
        validation::validate_file_name("clean_name", &self.clean_name)?;
        validation::validate_output_formats("formats", &self.formats)?;
        validation::validate_columns("columns", &self.columns)?;
        Ok(())
    }
}

#[cfg(feature = "cli")]
impl ConfigProvider for BoundaryArgs {
    fn raw_path(&self) -> &str {
        &self.raw_path
    }

    fn clean_path(&self) -> &str {
        &self.clean_path
    }

    fn output_name(&self) -> &str {
        &self.output_name
    }

    fn file_pattern(&self) -> &str {
        &self.pattern
    }
}

#[cfg(feature = "cli")]
impl Validate for BoundaryArgs {
    fn validate(&self) -> Result<()> {
        validation::validate_path("raw_path", &self.raw_path)?;
        validation::validate_path("clean_path", &self.clean_path)?;
        validation::validate_non_empty_string("pattern", &self.pattern)?;
        validation::validate_file_name("output_name", &self.output_name)?;
        validation::validate_file_extensions(
            "output_name",
            std::slice::from_ref(&self.output_name),
            &["shp"],
        )?;
        Ok(())
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        match &self.dataset {
            Dataset::SchoolDistricts(args) => args.validate(),
            Dataset::Boundaries(args) => args.validate(),
        }
    }
}
