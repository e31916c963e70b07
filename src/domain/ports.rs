use crate::domain::model::{OutputFormat, RecordCount};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// File names (not paths) directly inside `dir`, sorted.
    fn list_files(
        &self,
        dir: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn raw_path(&self) -> &str;
    fn clean_path(&self) -> &str;
    fn output_name(&self) -> &str;

    /// Output columns for tabular datasets.
    fn columns(&self) -> Vec<String> {
        Vec::new()
    }

    fn output_formats(&self) -> Vec<OutputFormat> {
        vec![OutputFormat::Csv]
    }

    /// Glob for raw files inside `raw_path`.
    fn file_pattern(&self) -> &str {
        "*"
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Extracted: RecordCount + Send;
    type Transformed: RecordCount + Send;

    fn name(&self) -> &str;
    async fn extract(&self) -> Result<Self::Extracted>;
    async fn transform(&self, data: Self::Extracted) -> Result<Self::Transformed>;
    async fn load(&self, result: Self::Transformed) -> Result<String>;
}
