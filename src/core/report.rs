use crate::domain::model::BatchReport;
use crate::domain::ports::Storage;
use crate::utils::error::{BulkError, Result};
use serde::Serialize;

#[derive(Serialize)]
struct CsvRow<'a> {
    index: usize,
    image: &'a str,
    title: &'a str,
    product_id: &'a str,
    status: String,
    product_status: String,
    poll_attempts: u32,
    error: &'a str,
}

pub fn to_csv(report: &BatchReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for item in &report.items {
        writer.serialize(CsvRow {
            index: item.index + 1,
            image: &item.image,
            title: &item.title,
            product_id: item.product_id.as_deref().unwrap_or(""),
            status: item.status.to_string(),
            product_status: item
                .product_status
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_default(),
            poll_attempts: item.poll_attempts,
            error: item.error.as_deref().unwrap_or(""),
        })?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| BulkError::ProcessingError {
            message: format!("Failed to flush CSV report: {}", e),
        })?;
    String::from_utf8(bytes).map_err(|e| BulkError::ProcessingError {
        message: format!("CSV report is not UTF-8: {}", e),
    })
}

/// Writes `report-<batch>.json` and `report-<batch>.csv`, returning both names.
pub async fn write_report<S: Storage>(storage: &S, report: &BatchReport) -> Result<Vec<String>> {
    let json_name = format!("report-{}.json", report.batch_id);
    let csv_name = format!("report-{}.csv", report.batch_id);

    let json = serde_json::to_string_pretty(report)?;
    storage.write_file(&json_name, json.as_bytes()).await?;

    let csv = to_csv(report)?;
    storage.write_file(&csv_name, csv.as_bytes()).await?;

    tracing::debug!("Report written as {} and {}", json_name, csv_name);
    Ok(vec![json_name, csv_name])
}
