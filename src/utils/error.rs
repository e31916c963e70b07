use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Spreadsheet read failed: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("Shapefile operation failed: {0}")]
    ShapefileError(#[from] shapefile::Error),

    #[error("dBase table error: {0}")]
    DbaseError(#[from] shapefile::dbase::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid glob pattern: {0}")]
    PatternError(#[from] glob::PatternError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration field '{field}' is invalid: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field '{field}'")]
    MissingConfigError { field: String },

    #[error("Cannot resolve a survey year from file name '{file_name}': {reason}")]
    FilenameError { file_name: String, reason: String },

    #[error("Unknown state code '{code}' in '{file_name}'")]
    UnknownStateCode { file_name: String, code: String },

    #[error("Schema mismatch in '{source_name}': {reason}")]
    SchemaMismatchError { source_name: String, reason: String },

    #[error("No input files found in '{path}'")]
    NoInputFiles { path: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Processing,
    Output,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::PatternError(_) => ErrorCategory::Configuration,
            EtlError::SpreadsheetError(_)
            | EtlError::ShapefileError(_)
            | EtlError::DbaseError(_)
            | EtlError::FilenameError { .. }
            | EtlError::NoInputFiles { .. } => ErrorCategory::Input,
            EtlError::UnknownStateCode { .. }
            | EtlError::SchemaMismatchError { .. }
            | EtlError::ProcessingError { .. } => ErrorCategory::Processing,
            EtlError::CsvError(_) | EtlError::SerializationError(_) => ErrorCategory::Output,
            EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Input => match self {
                // An empty raw directory usually means the refresh has not been downloaded yet
                EtlError::NoInputFiles { .. } => ErrorSeverity::Medium,
                _ => ErrorSeverity::High,
            },
            ErrorCategory::Processing | ErrorCategory::Output => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => {
                "Check the command line arguments or the TOML configuration file"
            }
            EtlError::PatternError(_) => "Fix the shapefile glob pattern (e.g. tl_2016_*_unsd.shp)",
            EtlError::SpreadsheetError(_) => {
                "Make sure every file in the raw directory is a readable spreadsheet"
            }
            EtlError::ShapefileError(_) | EtlError::DbaseError(_) => {
                "Make sure each .shp file has matching .shx and .dbf files next to it"
            }
            EtlError::FilenameError { .. } => {
                "Raw spreadsheet names must carry a year, e.g. elsec00t.xls or elsec92.xls"
            }
            EtlError::UnknownStateCode { .. } => {
                "District identifiers must start with a two digit state code between 01 and 51"
            }
            EtlError::SchemaMismatchError { .. } => {
                "Remove or re-download the input file whose layout differs from the others"
            }
            EtlError::NoInputFiles { .. } => "Download the raw files into the input directory first",
            EtlError::ProcessingError { .. } => "Re-run with --verbose to see which file failed",
            EtlError::CsvError(_) | EtlError::SerializationError(_) => {
                "Check that the output directory is writable"
            }
            EtlError::IoError(_) => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Could not read the raw input: {}", self),
            ErrorCategory::Processing => format!("Could not clean the data: {}", self),
            ErrorCategory::Output => format!("Could not write the output: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
