use crate::domain::model::RecordCount;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor_enabled: bool,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor_enabled,
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        let name = self.pipeline.name();
        let mut monitor = SystemMonitor::new(self.monitor_enabled);
        tracing::info!("Starting {} conversion", name);

        tracing::info!("Extracting raw files...");
        let raw_data = self.pipeline.extract().await?;
        tracing::info!("Extracted {} records", raw_data.record_count());
        monitor.log_stats("Extract");

        tracing::info!("Concatenating and sorting...");
        let transformed = self.pipeline.transform(raw_data).await?;
        tracing::info!("Transformed {} records", transformed.record_count());
        monitor.log_stats("Transform");

        tracing::info!("Exporting...");
        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!("{} written to {}", name, output_path);
        monitor.log_stats("Load");
        monitor.log_final_stats();

        Ok(output_path)
    }
}
