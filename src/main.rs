use clap::Parser;
use pod_bulk::app;
use pod_bulk::utils::{logger, validation::Validate};
use pod_bulk::CliConfig;

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    logger::init(config.verbose, config.log_json);

    tracing::info!("Starting pod-bulk");
    if config.verbose {
        tracing::debug!(
            "Template {}, fit {}, {} explicit images, dir {:?}",
            config.template_id,
            config.fit,
            config.images.len(),
            config.image_dir
        );
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    match app::run_batch(&config).await {
        Ok(run) => {
            app::print_summary(&run, &config.output_path);
            std::process::exit(app::run_exit_code(&run));
        }
        Err(e) => {
            tracing::error!(
                "❌ Batch failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }
}
