use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::api::monzo::{Account, MonzoClient};
use crate::services::conversion_service::{self, ConversionReport};
use crate::services::ofx_service;
use crate::utils::ExportError;

pub const OUTPUT_DIR: &str = "files";

/// Result of one completed export
#[derive(Debug)]
pub struct ExportResult {
    pub account: Account,
    pub file_name: String,
    pub path: PathBuf,
    pub report: ConversionReport,
}

/// `2016-04-08T12-00-00.123456.ofx`
pub fn export_file_name(now: DateTime<Local>) -> String {
    format!("{}.ofx", now.format("%Y-%m-%dT%H-%M-%S%.6f"))
}

/// Run the whole export for one authorization code: token exchange, first
/// account, its transactions, conversion, and a new file under `output_dir`.
pub async fn export_transactions(
    client: &MonzoClient,
    code: &str,
    output_dir: &Path,
) -> Result<ExportResult, ExportError> {
    let token = client.exchange_code(code).await?;

    let account = client
        .list_accounts(&token.access_token, &token.user_id)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ExportError::NoAccounts(token.user_id.clone()))?;

    let transactions = client
        .list_transactions(&token.access_token, &account.id)
        .await?;
    info!(
        "Fetched {} transactions for account {}",
        transactions.len(),
        account.id
    );

    let (document, report) = conversion_service::convert_with_report(&account.id, &transactions);
    if document.is_empty() {
        info!(
            "Nothing to export for account {}, writing an empty statement",
            account.id
        );
    }

    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|source| ExportError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;

    let file_name = export_file_name(Local::now());
    let path = output_dir.join(&file_name);
    ofx_service::write_to_path(&document, &path).await?;

    info!(
        "Wrote {} transactions to {} ({} skipped, {} with bad timestamps)",
        report.included,
        path.display(),
        report.skipped(),
        report.malformed_timestamps.len()
    );

    Ok(ExportResult {
        account,
        file_name,
        path,
        report,
    })
}
