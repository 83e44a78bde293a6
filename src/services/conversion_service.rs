use chrono::DateTime;
use tracing::{debug, warn};

use crate::models::{BankAccount, OfxDocument, StatementTransaction, TransactionRecord, TransactionType};

/// Pence per pound. Not currency-aware: every account is treated as a
/// two-decimal currency.
const MINOR_UNITS_PER_MAJOR: f64 = 100.0;

const RUNNING_TOTAL_LABEL: &str = "Running Total: ";

/// Posted date used when a record's `created` timestamp cannot be parsed
pub const UNPARSEABLE_POSTED: &str = "00010101000000.000[+00]";

/// What happened to each input record during a conversion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionReport {
    pub included: usize,
    pub skipped_zero_amount: Vec<String>,
    pub skipped_declined: Vec<String>,
    pub malformed_timestamps: Vec<String>,
}

impl ConversionReport {
    pub fn skipped(&self) -> usize {
        self.skipped_zero_amount.len() + self.skipped_declined.len()
    }
}

/// Convert API transactions into an OFX document for `account_id`, without
/// the report. The export path always wants the report.
#[cfg(test)]
pub fn convert(account_id: &str, transactions: &[TransactionRecord]) -> OfxDocument {
    convert_with_report(account_id, transactions).0
}

/// Convert API transactions into an OFX document for `account_id`, also
/// returning what was skipped or degraded.
///
/// Records are visited in input order and the output keeps that order.
/// Zero-amount records (PIN resets and similar) and declined authorizations are
/// dropped. A record whose timestamp fails to parse is still emitted, with
/// [`UNPARSEABLE_POSTED`] as its posted date.
pub fn convert_with_report(
    account_id: &str,
    transactions: &[TransactionRecord],
) -> (OfxDocument, ConversionReport) {
    let mut document = OfxDocument::new(BankAccount::checking(account_id));
    let mut report = ConversionReport::default();

    for tx in transactions {
        if tx.amount == 0 {
            debug!("Skipping transaction {} because amount is 0", tx.id);
            report.skipped_zero_amount.push(tx.id.clone());
            continue;
        }
        if tx.is_declined() {
            debug!(
                "Skipping transaction {} because it was declined ({})",
                tx.id, tx.decline_reason
            );
            report.skipped_declined.push(tx.id.clone());
            continue;
        }

        let posted = match format_posted(&tx.created) {
            Some(posted) => posted,
            None => {
                warn!(
                    "Transaction {} has unparseable created timestamp {:?}",
                    tx.id, tx.created
                );
                report.malformed_timestamps.push(tx.id.clone());
                UNPARSEABLE_POSTED.to_string()
            }
        };

        document.push(StatementTransaction {
            trn_type: TransactionType::Pos,
            posted,
            amount: to_major_units(tx.amount),
            fit_id: tx.id.clone(),
            name: tx.description.clone(),
            running_total: format!("{}{}", RUNNING_TOTAL_LABEL, format_running_total(tx.account_balance)),
        });
        report.included += 1;
    }

    (document, report)
}

/// RFC3339 -> `YYYYMMDDhhmmss.sss[±HH]`
///
/// The offset keeps only whole hours, truncated toward zero, so `+05:30`
/// renders as `[+05]`. The sign follows the full offset: `-00:30` is `[-00]`.
pub fn format_posted(created: &str) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(created).ok()?;
    let offset = parsed.offset().local_minus_utc();
    let sign = if offset < 0 { '-' } else { '+' };
    Some(format!(
        "{}[{}{:02}]",
        parsed.format("%Y%m%d%H%M%S%.3f"),
        sign,
        offset.abs() / 3600
    ))
}

pub fn to_major_units(minor: i64) -> f64 {
    minor as f64 / MINOR_UNITS_PER_MAJOR
}

fn format_running_total(balance: i64) -> String {
    format!("{:.2}", to_major_units(balance))
}
