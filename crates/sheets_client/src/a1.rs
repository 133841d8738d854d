//! A1 notation. Rows are 1-based, columns 0-based, matching `LedgerStore`.

use sheetsync_recon::RowSpan;

/// Convert column index to letters (0 -> A, 25 -> Z, 26 -> AA, 51 -> AZ).
pub fn col_to_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Sheet name as a range prefix: always single-quoted, inner quotes doubled.
pub fn quote_sheet(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

/// `'Sheet'!C5`
pub fn cell(sheet: &str, row: u32, col: usize) -> String {
    format!("{}!{}{}", quote_sheet(sheet), col_to_letter(col), row)
}

/// Columns `0..width` of one row: `'Sheet'!A5:F5`.
pub fn row(sheet: &str, row: u32, width: usize) -> String {
    let last = col_to_letter(width.saturating_sub(1));
    format!("{}!A{row}:{last}{row}", quote_sheet(sheet))
}

/// A row span. Open-ended spans run to the end of the sheet: `'Sheet'!A2:AZ`.
pub fn span(sheet: &str, span: RowSpan) -> String {
    let last = col_to_letter(span.width.saturating_sub(1));
    match span.end {
        Some(end) => format!("{}!A{}:{last}{end}", quote_sheet(sheet), span.start),
        None => format!("{}!A{}:{last}", quote_sheet(sheet), span.start),
    }
}
