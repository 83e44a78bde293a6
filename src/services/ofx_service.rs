use std::path::Path;

use quick_xml::escape::escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

use crate::models::{OfxDocument, StatementTransaction};

/// Every line of the file starts with this margin
const MARGIN: &str = "  ";
/// One nesting level
const INDENT_WIDTH: usize = 4;

/// OFX rendering errors
#[derive(Debug, Error)]
pub enum OfxError {
    #[error("XML rendering failed: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Rendered document is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render the document as OFX/XML.
///
/// Layout:
///
/// ```text
///   <OFX>
///       <BANKMSGSRSV1>
///           <STMTRS>
///               <BANKACCTFROM>...</BANKACCTFROM>
///               <BANKTRANLIST>
///                   <STMTTRN>
///                       <TRNTYPE>POS</TRNTYPE>
///                       ...
///                       <!--Running Total: 130.13-->
///                   </STMTTRN>
///               </BANKTRANLIST>
///           </STMTRS>
///       </BANKMSGSRSV1>
///   </OFX>
/// ```
///
/// No XML declaration and no trailing newline.
pub fn serialize(doc: &OfxDocument) -> Result<Vec<u8>, OfxError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_WIDTH);

    open(&mut writer, "OFX")?;
    open(&mut writer, "BANKMSGSRSV1")?;
    open(&mut writer, "STMTRS")?;

    open(&mut writer, "BANKACCTFROM")?;
    leaf(&mut writer, "BANKID", &doc.bank_account.bank_id)?;
    leaf(&mut writer, "ACCTID", &doc.bank_account.account_id)?;
    leaf(&mut writer, "ACCTTYPE", doc.bank_account.account_type.as_str())?;
    close(&mut writer, "BANKACCTFROM")?;

    open(&mut writer, "BANKTRANLIST")?;
    for tx in &doc.transactions {
        write_transaction(&mut writer, tx)?;
    }
    close(&mut writer, "BANKTRANLIST")?;

    close(&mut writer, "STMTRS")?;
    close(&mut writer, "BANKMSGSRSV1")?;
    close(&mut writer, "OFX")?;

    let body = String::from_utf8(writer.into_inner())?;
    Ok(with_margin(&body).into_bytes())
}

/// Render the document and write it to `path`, replacing any existing file.
pub async fn write_to_path(doc: &OfxDocument, path: &Path) -> Result<(), OfxError> {
    let bytes = serialize(doc)?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

fn write_transaction(writer: &mut Writer<Vec<u8>>, tx: &StatementTransaction) -> Result<(), OfxError> {
    open(writer, "STMTTRN")?;
    leaf(writer, "TRNTYPE", tx.trn_type.as_str())?;
    leaf(writer, "DTPOSTED", &tx.posted)?;
    leaf(writer, "TRNAMT", &format_amount(tx.amount))?;
    leaf(writer, "FITID", &tx.fit_id)?;
    leaf(writer, "NAME", &tx.name)?;
    writer.write_event(Event::Comment(BytesText::from_escaped(comment_text(&tx.running_total))))?;
    close(writer, "STMTTRN")
}

fn open(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), OfxError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    Ok(())
}

fn close(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), OfxError> {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn leaf(writer: &mut Writer<Vec<u8>>, name: &str, value: &str) -> Result<(), OfxError> {
    open(writer, name)?;
    // Always emit the text event, even when empty, so the closing tag stays on
    // the same line as the opening one.
    writer.write_event(Event::Text(BytesText::from_escaped(escape_text(value))))?;
    close(writer, name)
}

/// XML-escape and turn line breaks and tabs into character references, so a
/// value never spans lines and never picks up the margin. Characters XML 1.0
/// does not allow become U+FFFD.
fn escape_text(value: &str) -> String {
    let allowed: String = value
        .chars()
        .map(|c| if is_xml_char(c) { c } else { '\u{FFFD}' })
        .collect();
    escape(&allowed)
        .replace('\n', "&#xA;")
        .replace('\r', "&#xD;")
        .replace('\t', "&#x9;")
}

/// The XML 1.0 `Char` production
fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// `--` is not allowed inside a comment
fn comment_text(value: &str) -> String {
    let mut text = value.to_string();
    while text.contains("--") {
        text = text.replace("--", "- -");
    }
    if text.ends_with('-') {
        text.push(' ');
    }
    text
}

/// Shortest decimal that round-trips: `-8.49`, `-14`, `0.5`. Never uses
/// exponent notation.
fn format_amount(amount: f64) -> String {
    format!("{}", amount)
}

fn with_margin(body: &str) -> String {
    let mut out = String::with_capacity(body.len() + MARGIN.len() * (body.lines().count() + 1));
    for (i, line) in body.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(MARGIN);
        out.push_str(line);
    }
    out
}
