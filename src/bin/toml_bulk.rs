use clap::Parser;
use pod_bulk::app;
use pod_bulk::core::ConfigProvider;
use pod_bulk::utils::{logger, validation::Validate};
use pod_bulk::JobConfig;

#[derive(Parser)]
#[command(name = "toml-bulk")]
#[command(about = "Run a bulk product job described in a TOML file")]
struct Args {
    /// Path to the TOML job file
    #[arg(short, long, default_value = "bulk-job.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Override the job's dry_run setting
    #[arg(long)]
    dry_run: Option<bool>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    logger::init(args.verbose, args.log_json);

    tracing::info!("🚀 Starting TOML bulk job");
    tracing::info!("📁 Loading job from: {}", args.config);

    let mut config = match JobConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load job file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if let Some(dry_run) = args.dry_run {
        config.job.dry_run = dry_run;
        tracing::info!("🔧 Dry run overridden to: {}", dry_run);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    tracing::info!("✅ Job loaded and validated successfully");
    display_config_summary(&config);

    match app::run_batch(&config).await {
        Ok(run) => {
            app::print_summary(&run, config.output_path());
            std::process::exit(app::run_exit_code(&run));
        }
        Err(e) => {
            tracing::error!(
                "❌ Job failed: {} (Category: {:?}, Severity: {:?})",
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

fn display_config_summary(config: &JobConfig) {
    let rules = config.rules();

    println!("📋 Job Summary:");
    println!("  Job: {}", config.job.name);
    if let Some(description) = &config.job.description {
        println!("  Description: {}", description);
    }
    println!("  Template: {}", config.template_id());
    println!("  API: {}", config.api_endpoint());
    println!("  Bucket: {} @ {}", config.bucket(), config.storage_url());
    println!(
        "  Images: {} listed{}",
        config.images().len(),
        config
            .image_dir()
            .map(|dir| format!(", plus everything in {}", dir))
            .unwrap_or_default()
    );
    println!("  Fit: {} (background {})", config.fit_mode(), config.background());
    println!("  Title: {}", rules.title_template);
    if !rules.variant_ids.is_empty() {
        println!("  Variants: {}", rules.variant_ids.join(", "));
    }
    println!(
        "  Polling: {} attempts every {}ms",
        config.poll_attempts(),
        config.poll_interval_ms()
    );
    println!("  Output: {}", config.output_path());

    if config.dry_run() {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}
