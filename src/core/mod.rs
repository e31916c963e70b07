pub mod etl;
pub mod school_districts;
pub mod spreadsheet;
pub mod states;

pub use crate::domain::model::{DistrictTable, MergedLayer, Record};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
