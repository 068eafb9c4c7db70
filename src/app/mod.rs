// Application layer: wires the reqwest adapters and local report storage into the engine.

use crate::adapters::{BucketClient, PodApiClient};
use crate::config::local_storage::LocalStorage;
use crate::core::batch::{BatchRun, BatchSettings, BulkEngine};
use crate::domain::model::ItemStatus;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;

pub type HttpBulkEngine = BulkEngine<PodApiClient, BucketClient, LocalStorage>;

pub fn build_engine<C: ConfigProvider + ?Sized>(config: &C) -> Result<HttpBulkEngine> {
    let api = PodApiClient::from_config(config)?;
    let store = BucketClient::from_config(config)?;
    let storage = LocalStorage::new(config.output_path().to_string());
    let settings = BatchSettings::from_config(config)?;
    Ok(BulkEngine::new(api, store, storage, settings))
}

pub async fn run_batch<C: ConfigProvider + ?Sized>(config: &C) -> Result<BatchRun> {
    let engine = build_engine(config)?;
    engine.run().await
}

/// Human-readable outcome for the terminal.
pub fn print_summary(run: &BatchRun, output_path: &str) {
    let report = &run.report;
    let summary = report.summary();

    println!(
        "Batch {} ({}, template '{}')",
        report.batch_id,
        if report.dry_run { "dry run" } else { "live" },
        report.template_name
    );
    for item in &report.items {
        let marker = match item.status {
            ItemStatus::Completed => "✅",
            ItemStatus::Planned => "📝",
            ItemStatus::Timeout => "⏱️",
            ItemStatus::Failed => "❌",
        };
        match (&item.product_id, &item.error) {
            (_, Some(error)) => println!("{} {} -> {}: {}", marker, item.image, item.title, error),
            (Some(id), None) => println!("{} {} -> {} [{}]", marker, item.image, item.title, id),
            (None, None) => println!("{} {} -> {}", marker, item.image, item.title),
        }
    }
    println!(
        "Completed: {}, failed: {}, timed out: {}, planned: {}",
        summary.completed, summary.failed, summary.timeout, summary.planned
    );
    for file in &run.report_files {
        println!("📁 Report saved to: {}/{}", output_path.trim_end_matches('/'), file);
    }
    if let Some(e) = &run.report_error {
        eprintln!("❌ Report was not saved to {}: {}", output_path, e);
        eprintln!("💡 {}", e.recovery_suggestion());
    }
}

/// Exit code for a finished run: the report error's code when the report was
/// lost, 4 when any item failed or timed out, otherwise 0.
pub fn run_exit_code(run: &BatchRun) -> i32 {
    if let Some(e) = &run.report_error {
        return e.exit_code();
    }
    let summary = run.report.summary();
    if summary.failed + summary.timeout > 0 {
        4
    } else {
        0
    }
}
