//! Input data: UV reference curves and correlator ensembles.

pub mod correlator;
pub mod uv;

pub use correlator::*;
pub use uv::*;

/// Parse a whitespace-separated numeric table, keeping the first `ncols` columns.
///
/// `#` starts a comment line; blank lines are skipped. Errors name the offending line.
pub(crate) fn read_numeric_table(text: &str, ncols: usize) -> Result<Vec<Vec<f64>>, String> {
    let normalized = text.replace('\t', " ");
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(normalized.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| format!("parse error: {e}"))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let fields: Vec<&str> = record.iter().map(str::trim).filter(|f| !f.is_empty()).collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < ncols {
            return Err(format!(
                "line {line}: expected {ncols} columns, found {}",
                fields.len()
            ));
        }
        let row = fields[..ncols]
            .iter()
            .map(|f| {
                f.parse::<f64>()
                    .map_err(|_| format!("line {line}: '{f}' is not a number"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }
    Ok(rows)
}
