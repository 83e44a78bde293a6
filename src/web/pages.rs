//! HTML pages served by the local web frontend

use quick_xml::escape::escape;

use crate::services::export_service::ExportResult;
use crate::utils::ExportError;

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>body {{ font-family: sans-serif; margin: 3em; }} code {{ background: #eee; padding: 0 .3em; }}</style>\n\
         </head>\n<body>\n{body}\n</body>\n</html>\n",
        title = escape(title),
        body = body,
    )
}

pub fn index_page(auth_url: &str) -> String {
    layout(
        "Export Monzo transactions",
        &format!(
            "<h1>Export Monzo transactions to OFX</h1>\n\
             <p>Sign in with Monzo to download your transaction history as an OFX file.</p>\n\
             <p><a href=\"{}\">Connect to Monzo</a></p>",
            escape(auth_url)
        ),
    )
}

pub fn exported_page(result: &ExportResult) -> String {
    let report = &result.report;
    let mut notes = format!(
        "<li>{} transactions exported</li>\n<li>{} skipped (zero amount)</li>\n<li>{} skipped (declined)</li>",
        report.included,
        report.skipped_zero_amount.len(),
        report.skipped_declined.len(),
    );
    if !report.malformed_timestamps.is_empty() {
        notes.push_str(&format!(
            "\n<li>{} with an unreadable date: {}</li>",
            report.malformed_timestamps.len(),
            escape(&report.malformed_timestamps.join(", "))
        ));
    }

    layout(
        "Export complete",
        &format!(
            "<h1>Export complete</h1>\n\
             <p>Account <code>{account}</code> ({description})</p>\n\
             <ul>\n{notes}\n</ul>\n\
             <p>Saved to <code>{path}</code></p>\n\
             <p><a href=\"/files/{name}\">Download {name}</a></p>",
            account = escape(&result.account.id),
            description = escape(&result.account.description),
            notes = notes,
            path = escape(&result.path.display().to_string()),
            name = escape(&result.file_name),
        ),
    )
}

pub fn error_page(err: &ExportError) -> String {
    layout(
        "Export failed",
        &format!(
            "<h1>Export failed</h1>\n<p>{}</p>\n<p><a href=\"/\">Try again</a></p>",
            escape(&err.to_string())
        ),
    )
}
