use clap::Parser;
use govdata_etl::domain::ports::Pipeline;
use govdata_etl::utils::error::{EtlError, ErrorSeverity};
use govdata_etl::utils::{logger, validation::Validate};
use govdata_etl::{
    BoundaryPipeline, CliConfig, Dataset, EtlEngine, LocalStorage, SchoolDistrictPipeline,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting govdata-etl");
    tracing::debug!("CLI config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let result = match config.dataset {
        Dataset::SchoolDistricts(args) => {
            let pipeline = SchoolDistrictPipeline::new(LocalStorage::default(), args);
            run(pipeline, config.monitor).await
        }
        Dataset::Boundaries(args) => run(BoundaryPipeline::new(args), config.monitor).await,
    };

    match result {
        Ok(output_path) => {
            println!("✅ Completed!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Conversion failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(exit_code(&e));
        }
    }

    Ok(())
}

async fn run<P: Pipeline>(pipeline: P, monitor: bool) -> Result<String, EtlError> {
    EtlEngine::new_with_monitoring(pipeline, monitor).run().await
}

// 根據錯誤嚴重程度決定退出碼
fn exit_code(error: &EtlError) -> i32 {
    match error.severity() {
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}
