//! UV reference curve provider.
//!
//! The perturbative curve is computed elsewhere and tabulated as whitespace columns
//!
//! ```text
//! # g2 = 2.31
//! # omega/T   LO/T^3   NLO/T^3
//! 0.01        1.2e-4   1.5e-4
//! ...
//! ```
//!
//! Lines starting with `#` are comments; a `g2 = <value>` comment carries the coupling.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::UvOrder;
use crate::error::SpfError;
use crate::math::CubicSpline;

/// Frequency grid plus LO and NLO curves, all in units of `T`/`T³`.
#[derive(Debug, Clone, PartialEq)]
pub struct UvCurves {
    pub omega_by_t: Vec<f64>,
    pub lo: Vec<f64>,
    pub nlo: Vec<f64>,
    pub coupling: Option<f64>,
}

impl UvCurves {
    pub fn select(&self, order: UvOrder) -> &[f64] {
        match order {
            UvOrder::Lo => &self.lo,
            UvOrder::Nlo => &self.nlo,
        }
    }

    /// Interpolate the selected curve. Evaluating outside the grid is an error.
    pub fn interpolant(&self, order: UvOrder) -> Result<CubicSpline, SpfError> {
        if let Some(&first) = self.omega_by_t.first() {
            if first <= 0.0 {
                return Err(SpfError::Config(format!(
                    "UV grid must start above omega/T = 0 (first point is {first})"
                )));
            }
        }
        CubicSpline::new(self.omega_by_t.clone(), self.select(order).to_vec())
    }
}

/// Source of the UV reference curves.
pub trait UvProvider {
    fn curves(&self) -> Result<UvCurves, SpfError>;
}

/// Curves read from a whitespace table on disk.
#[derive(Debug, Clone)]
pub struct UvTable {
    path: PathBuf,
}

impl UvTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UvProvider for UvTable {
    fn curves(&self) -> Result<UvCurves, SpfError> {
        let text = fs::read_to_string(&self.path)
            .map_err(|e| SpfError::Io(format!("failed to read UV table '{}': {e}", self.path.display())))?;
        parse_uv_table(&text)
            .map_err(|e| SpfError::Data(format!("UV table '{}': {e}", self.path.display())))
    }
}

fn parse_uv_table(text: &str) -> Result<UvCurves, String> {
    let coupling = text
        .lines()
        .filter_map(|l| l.trim().strip_prefix('#'))
        .find_map(parse_coupling);

    let rows = super::read_numeric_table(text, 3)?;
    if rows.len() < 2 {
        return Err("need at least two rows".to_string());
    }

    let mut curves = UvCurves {
        omega_by_t: Vec::with_capacity(rows.len()),
        lo: Vec::with_capacity(rows.len()),
        nlo: Vec::with_capacity(rows.len()),
        coupling,
    };
    for row in rows {
        curves.omega_by_t.push(row[0]);
        curves.lo.push(row[1]);
        curves.nlo.push(row[2]);
    }
    Ok(curves)
}

fn parse_coupling(comment: &str) -> Option<f64> {
    let (key, value) = comment.split_once('=')?;
    if key.trim() != "g2" {
        return None;
    }
    value.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn table(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn reads_grid_curves_and_coupling() {
        let f = table("# g2 = 2.5\n# omega LO NLO\n0.1  1.0  1.1\n0.2   2.0 2.2\n\n0.4 4.0  4.4\n");
        let c = UvTable::new(f.path()).curves().unwrap();
        assert_eq!(c.omega_by_t, vec![0.1, 0.2, 0.4]);
        assert_eq!(c.select(UvOrder::Lo), &[1.0, 2.0, 4.0]);
        assert_eq!(c.select(UvOrder::Nlo), &[1.1, 2.2, 4.4]);
        assert_eq!(c.coupling, Some(2.5));
    }

    #[test]
    fn coupling_is_optional() {
        let f = table("0.1 1 1\n0.2 2 2\n");
        assert_eq!(UvTable::new(f.path()).curves().unwrap().coupling, None);
    }

    #[test]
    fn interpolant_refuses_to_extrapolate() {
        let f = table("0.1 1 1\n0.2 2 2\n0.4 4 4\n");
        let s = UvTable::new(f.path()).curves().unwrap().interpolant(UvOrder::Lo).unwrap();
        assert!((s.value(0.3).unwrap() - 3.0).abs() < 1e-12);
        assert!(matches!(s.value(0.05), Err(SpfError::Domain { .. })));
        assert!(matches!(s.value(0.41), Err(SpfError::Domain { .. })));
    }

    #[test]
    fn grid_must_start_above_zero() {
        let f = table("0.0 0 0\n0.2 2 2\n");
        let err = UvTable::new(f.path()).curves().unwrap().interpolant(UvOrder::Nlo).unwrap_err();
        assert!(matches!(err, SpfError::Config(_)));
    }

    #[test]
    fn malformed_rows_are_data_errors() {
        let f = table("0.1 1\n0.2 2 2\n");
        assert!(matches!(UvTable::new(f.path()).curves(), Err(SpfError::Data(_))));
        let f = table("0.1 x 1\n0.2 2 2\n");
        assert!(matches!(UvTable::new(f.path()).curves(), Err(SpfError::Data(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = UvTable::new("/nonexistent/uv.dat").curves().unwrap_err();
        assert!(matches!(err, SpfError::Io(_)));
    }
}
