//! CSV export of a stocktake session's working view.
//!
//! The file is UTF-8 with a byte-order mark so spreadsheet tools pick the
//! right encoding, and every field is quoted.

use std::io::Write;

use crate::error::CoreError;
use crate::stocktake::StocktakeLine;
use crate::types::DbId;

/// UTF-8 byte-order mark written before the header row.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const CSV_HEADERS: [&str; 12] = [
    "LineID",
    "AssetID",
    "AssetName",
    "ManageCode",
    "SerialNumber",
    "Found",
    "MissingQty",
    "FoundLocationID",
    "Remarks",
    "CheckedAt",
    "Quantity",
    "RemainQuantity",
];

/// File name for a session export.
pub fn export_filename(session_id: DbId) -> String {
    format!("stocktake_session_{session_id}.csv")
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn record(line: &StocktakeLine) -> [String; 12] {
    [
        line.id.to_string(),
        line.asset_id.to_string(),
        opt(line.asset_name.as_deref()),
        opt(line.manage_code.as_deref()),
        opt(line.serial_number.as_deref()),
        line.found_label().to_string(),
        opt(line.missing_qty),
        opt(line.found_location_id),
        opt(line.remarks.as_deref()),
        opt(line.checked_at.map(|t| t.to_rfc3339())),
        opt(line.quantity),
        opt(line.remain_quantity),
    ]
}

/// Write the BOM, header and one row per line to `out`.
pub fn write_lines_csv<'a, W, I>(mut out: W, lines: I) -> Result<(), CoreError>
where
    W: Write,
    I: IntoIterator<Item = &'a StocktakeLine>,
{
    out.write_all(UTF8_BOM)
        .map_err(|e| CoreError::Export(e.to_string()))?;

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(out);

    writer
        .write_record(CSV_HEADERS)
        .map_err(|e| CoreError::Export(e.to_string()))?;
    for line in lines {
        writer
            .write_record(record(line))
            .map_err(|e| CoreError::Export(e.to_string()))?;
    }
    writer.flush().map_err(|e| CoreError::Export(e.to_string()))
}

/// Render lines to an in-memory CSV document.
pub fn lines_to_csv<'a, I>(lines: I) -> Result<Vec<u8>, CoreError>
where
    I: IntoIterator<Item = &'a StocktakeLine>,
{
    let mut buf = Vec::new();
    write_lines_csv(&mut buf, lines)?;
    Ok(buf)
}
