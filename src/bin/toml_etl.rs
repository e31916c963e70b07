use anyhow::Context;
use clap::Parser;
use govdata_etl::config::toml_config::TomlConfig;
use govdata_etl::domain::ports::ConfigProvider;
use govdata_etl::utils::error::ErrorSeverity;
use govdata_etl::utils::{logger, validation::Validate};
use govdata_etl::{BoundaryPipeline, EtlEngine, EtlError, LocalStorage, SchoolDistrictPipeline};

#[derive(Parser)]
#[command(name = "toml-etl")]
#[command(about = "Runs every dataset conversion described in a TOML file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "etl-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config file '{}'", args.config))?;

    // 初始化日誌
    if config.json_logs() {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&config)?;
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());

    if let Some(districts) = config.school_districts.clone() {
        let pipeline = SchoolDistrictPipeline::new(LocalStorage::default(), districts);
        let result = EtlEngine::new_with_monitoring(pipeline, monitor_enabled)
            .run()
            .await;
        report(result);
    }

    if let Some(boundaries) = config.boundaries.clone() {
        let pipeline = BoundaryPipeline::new(boundaries);
        let result = EtlEngine::new_with_monitoring(pipeline, monitor_enabled)
            .run()
            .await;
        report(result);
    }

    Ok(())
}

fn report(result: Result<String, EtlError>) {
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

            let exit_code = match e.severity() {
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name, config.pipeline.version
    );
    if let Some(description) = &config.pipeline.description {
        println!("  Description: {}", description);
    }
    if let Some(districts) = &config.school_districts {
        println!(
            "  School districts: {} -> {}{}",
            districts.raw_path, districts.clean_path, districts.clean_name
        );
    }
    if let Some(boundaries) = &config.boundaries {
        println!(
            "  Boundaries: {}{} -> {}{}",
            boundaries.raw_path, boundaries.pattern, boundaries.clean_path, boundaries.output_name
        );
    }
    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }
    println!();
}

fn perform_dry_run(config: &TomlConfig) -> anyhow::Result<()> {
    println!("🔍 Dry Run Analysis:");

    if let Some(districts) = &config.school_districts {
        println!();
        println!("📊 School districts:");
        let entries = std::fs::read_dir(&districts.raw_path)
            .with_context(|| format!("cannot list '{}'", districts.raw_path))?;
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| govdata_etl::core::spreadsheet::is_raw_spreadsheet(name))
            .collect();
        names.sort();

        for name in &names {
            match govdata_etl::core::school_districts::year_from_filename(name) {
                Ok(year) => println!(
                    "  {} -> {} (id column {})",
                    name,
                    year,
                    govdata_etl::core::school_districts::state_id_column(year)
                ),
                Err(e) => println!("  {} -> ⚠️ {}", name, e),
            }
        }
        println!(
            "  Formats: {:?}",
            districts.output_formats()
        );
    }

    if let Some(boundaries) = &config.boundaries {
        println!();
        println!("🗺️ Boundaries:");
        let pattern = std::path::Path::new(&boundaries.raw_path).join(&boundaries.pattern);
        let matches: Vec<_> = glob::glob(&pattern.to_string_lossy())?
            .filter_map(|entry| entry.ok())
            .collect();
        println!("  {} shapefiles match {}", matches.len(), pattern.display());
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
    Ok(())
}
