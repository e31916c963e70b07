use crate::app::pipelines::boundary_pipeline::DEFAULT_PATTERN;
use crate::core::ConfigProvider;
use crate::domain::model::OutputFormat;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub school_districts: Option<SchoolDistrictConfig>,
    pub boundaries: Option<BoundaryConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolDistrictConfig {
    #[serde(default = "default_raw_path")]
    pub raw_path: String,
    #[serde(default = "default_clean_path")]
    pub clean_path: String,
    #[serde(default = "default_clean_name")]
    pub clean_name: String,
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<String>,
    pub columns: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryConfig {
    #[serde(default = "default_shapefile_path")]
    pub raw_path: String,
    #[serde(default = "default_clean_path")]
    pub clean_path: String,
    #[serde(default = "default_pattern")]
    pub pattern: String,
    #[serde(default = "default_shapefile_name")]
    pub output_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: Option<bool>,
}

fn default_raw_path() -> String {
    "../data_raw/".to_string()
}

fn default_clean_path() -> String {
    "../data_clean/".to_string()
}

fn default_clean_name() -> String {
    "us_school_districts.csv".to_string()
}

fn default_output_formats() -> Vec<String> {
    vec!["csv".to_string()]
}

fn default_shapefile_path() -> String {
    "../data_raw/unsd_shps/".to_string()
}

fn default_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

fn default_shapefile_name() -> String {
    "unsd_compiled.shp".to_string()
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_ROOT})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;

        if self.school_districts.is_none() && self.boundaries.is_none() {
            return Err(EtlError::MissingConfigError {
                field: "school_districts or boundaries".to_string(),
            });
        }

        if let Some(districts) = &self.school_districts {
            districts.validate()?;
        }
        if let Some(boundaries) = &self.boundaries {
            boundaries.validate()?;
        }

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

impl ConfigProvider for SchoolDistrictConfig {
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
        self.columns.clone().unwrap_or_default()
    }

    fn output_formats(&self) -> Vec<OutputFormat> {
        self.output_formats
            .iter()
            .filter_map(|f| OutputFormat::parse(f))
            .collect()
    }
}

impl Validate for SchoolDistrictConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("school_districts.raw_path", &self.raw_path)?;
        validation::validate_path("school_districts.clean_path", &self.clean_path)?;
        validation::validate_file_name("school_districts.clean_name", &self.clean_name)?;
        validation::validate_output_formats(
            "school_districts.output_formats",
            &self.output_formats,
        )?;
        if let Some(columns) = &self.columns {
            validation::validate_columns("school_districts.columns", columns)?;
        }
        Ok(())
    }
}

impl ConfigProvider for BoundaryConfig {
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

impl Validate for BoundaryConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("boundaries.raw_path", &self.raw_path)?;
        validation::validate_path("boundaries.clean_path", &self.clean_path)?;
        validation::validate_non_empty_string("boundaries.pattern", &self.pattern)?;
        validation::validate_file_name("boundaries.output_name", &self.output_name)?;
        validation::validate_file_extensions(
            "boundaries.output_name",
            std::slice::from_ref(&self.output_name),
            &["shp"],
        )?;
        Ok(())
    }
}
