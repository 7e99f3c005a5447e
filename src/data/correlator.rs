//! Correlator ingest.
//!
//! Two input shapes are supported, both in `G/G_norm` units:
//!
//! - mock mode: text table `tauT  G/Gnorm  err/Gnorm`, one row per separation
//! - bootstrap mode: JSON array `[sample][separation][tauT, G/Gnorm, err/Gnorm]`, with
//!   `null` for missing values
//!
//! Rows are dropped when non-finite, below `min_tau`, or outside `(0, 0.5)`. The
//! normalised central value is kept for output; fitting works with values multiplied
//! by `G_norm(τT)`.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use crate::domain::{CorrelatorData, Ensemble};
use crate::error::SpfError;
use crate::math::{dev_by_dist, gnorm, is_valid_separation, nan_median};

/// Tolerance when checking that all bootstrap samples share the separation grid.
const TAU_MATCH_TOL: f64 = 1e-9;

/// Read a mean/error table for mock bootstrap.
pub fn read_mock_table(path: &Path, min_tau: f64) -> Result<CorrelatorData, SpfError> {
    let text = fs::read_to_string(path)
        .map_err(|e| SpfError::Io(format!("failed to read correlator '{}': {e}", path.display())))?;
    let rows = super::read_numeric_table(&text, 3)
        .map_err(|e| SpfError::Data(format!("correlator '{}': {e}", path.display())))?;

    let mut tau = Vec::new();
    let mut norm_mean = Vec::new();
    let mut norm_err = Vec::new();
    let mut dropped = 0usize;
    for row in &rows {
        let (t, g, e) = (row[0], row[1], row[2]);
        if !keep_separation(t, g, min_tau) || !e.is_finite() {
            dropped += 1;
            continue;
        }
        tau.push(t);
        norm_mean.push(g);
        norm_err.push(e);
    }
    if dropped > 0 {
        log::warn!("dropped {dropped} of {} correlator rows", rows.len());
    }

    let mean = scale_by_gnorm(&tau, &norm_mean);
    let errors = scale_by_gnorm(&tau, &norm_err);
    check_errors(&tau, &errors)?;

    Ok(CorrelatorData {
        tau,
        ensemble: Ensemble::Mock { mean },
        errors,
        norm_mean,
        norm_err,
    })
}

/// Read a pre-bootstrapped ensemble.
pub fn read_bootstrap_json(path: &Path, min_tau: f64) -> Result<CorrelatorData, SpfError> {
    let file = File::open(path)
        .map_err(|e| SpfError::Io(format!("failed to open correlator '{}': {e}", path.display())))?;
    let raw: Vec<Vec<Vec<Option<f64>>>> = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| SpfError::Data(format!("invalid correlator JSON '{}': {e}", path.display())))?;
    bootstrap_from_raw(&raw, min_tau)
}

fn bootstrap_from_raw(raw: &[Vec<Vec<Option<f64>>>], min_tau: f64) -> Result<CorrelatorData, SpfError> {
    let Some(first) = raw.first() else {
        return Err(SpfError::Data("correlator ensemble is empty".to_string()));
    };
    let entry = |row: &[Option<f64>], k: usize| row.get(k).copied().flatten().unwrap_or(f64::NAN);

    // Separations are taken from the first sample.
    let mut columns = Vec::new();
    let mut tau = Vec::new();
    for (j, row) in first.iter().enumerate() {
        let t = entry(row, 0);
        if keep_separation(t, entry(row, 1), min_tau) {
            columns.push(j);
            tau.push(t);
        }
    }
    let dropped = first.len() - columns.len();
    if dropped > 0 {
        log::warn!("dropped {dropped} of {} separations", first.len());
    }

    let mut normalized = Vec::with_capacity(raw.len());
    for (k, sample) in raw.iter().enumerate() {
        if sample.len() != first.len() {
            return Err(SpfError::Data(format!(
                "sample {k} has {} separations, sample 0 has {}",
                sample.len(),
                first.len()
            )));
        }
        let mut row = Vec::with_capacity(columns.len());
        for (&j, &t) in columns.iter().zip(&tau) {
            let tk = entry(&sample[j], 0);
            if tk.is_finite() && (tk - t).abs() > TAU_MATCH_TOL {
                return Err(SpfError::Data(format!(
                    "sample {k} has tauT={tk} where sample 0 has {t}"
                )));
            }
            row.push(entry(&sample[j], 1));
        }
        normalized.push(row);
    }

    let column = |rows: &[Vec<f64>], j: usize| rows.iter().map(|r| r[j]).collect::<Vec<_>>();
    let norm_mean = (0..tau.len()).map(|j| nan_median(&column(&normalized, j))).collect();
    let norm_err = (0..tau.len()).map(|j| dev_by_dist(&column(&normalized, j))).collect();

    let samples: Vec<Vec<f64>> = normalized.iter().map(|r| scale_by_gnorm(&tau, r)).collect();
    let errors: Vec<f64> = (0..tau.len()).map(|j| dev_by_dist(&column(&samples, j))).collect();
    check_errors(&tau, &errors)?;

    Ok(CorrelatorData {
        tau,
        ensemble: Ensemble::Bootstrap(samples),
        errors,
        norm_mean,
        norm_err,
    })
}

fn keep_separation(tau: f64, value: f64, min_tau: f64) -> bool {
    if !(tau.is_finite() && value.is_finite()) || tau < min_tau {
        return false;
    }
    if !is_valid_separation(tau) {
        log::warn!("dropping tauT={tau}: outside (0, 0.5)");
        return false;
    }
    true
}

fn scale_by_gnorm(tau: &[f64], values: &[f64]) -> Vec<f64> {
    tau.iter().zip(values).map(|(t, v)| v * gnorm(*t)).collect()
}

fn check_errors(tau: &[f64], errors: &[f64]) -> Result<(), SpfError> {
    if tau.is_empty() {
        return Err(SpfError::Data("no usable separations left after filtering".to_string()));
    }
    if let Some((t, e)) = tau.iter().zip(errors).find(|(_, e)| !(**e > 0.0 && e.is_finite())) {
        return Err(SpfError::Data(format!("error at tauT={t} must be positive and finite (got {e})")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn file(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn mock_table_is_filtered_and_rescaled() {
        let f = file(
            "# tauT G err\n0.05 1.0 0.1\n0.2 1.1 0.01\n0.25 nan 0.01\n0.3 1.2 0.02\n0.5 1.3 0.02\n",
        );
        let d = read_mock_table(f.path(), 0.1).unwrap();
        assert_eq!(d.tau, vec![0.2, 0.3]);
        assert_eq!(d.norm_mean, vec![1.1, 1.2]);
        assert_eq!(d.norm_err, vec![0.01, 0.02]);
        let Ensemble::Mock { mean } = &d.ensemble else {
            panic!("expected mock ensemble");
        };
        assert!((mean[0] - 1.1 * gnorm(0.2)).abs() < 1e-12);
        assert!((d.errors[1] - 0.02 * gnorm(0.3)).abs() < 1e-12);
        assert_eq!(d.available_samples(), None);
    }

    #[test]
    fn mock_table_without_usable_rows_is_rejected() {
        let f = file("0.05 1.0 0.1\n");
        assert!(matches!(read_mock_table(f.path(), 0.1), Err(SpfError::Data(_))));
    }

    #[test]
    fn non_positive_error_is_rejected() {
        let f = file("0.2 1.0 0.0\n0.3 1.0 0.1\n");
        assert!(matches!(read_mock_table(f.path(), 0.0), Err(SpfError::Data(_))));
    }

    #[test]
    fn bootstrap_json_uses_first_sample_separations() {
        let f = file(
            r#"[
                [[0.1, 1.0, 0.1], [0.2, 2.0, 0.1], [0.3, null, 0.1]],
                [[0.1, 1.2, 0.1], [0.2, 2.2, 0.1], [0.3, 3.0, 0.1]],
                [[0.1, 1.4, 0.1], [0.2, 2.4, 0.1], [0.3, 3.1, 0.1]]
            ]"#,
        );
        let d = read_bootstrap_json(f.path(), 0.0).unwrap();
        assert_eq!(d.tau, vec![0.1, 0.2]);
        assert!((d.norm_mean[0] - 1.2).abs() < 1e-12);
        assert!((d.norm_mean[1] - 2.2).abs() < 1e-12);
        assert_eq!(d.available_samples(), Some(3));
        let Ensemble::Bootstrap(samples) = &d.ensemble else {
            panic!("expected bootstrap ensemble");
        };
        assert!((samples[2][1] - 2.4 * gnorm(0.2)).abs() < 1e-9);
        assert!(d.errors.iter().all(|e| *e > 0.0));
    }

    #[test]
    fn bootstrap_json_rejects_inconsistent_grids() {
        let raw = vec![
            vec![vec![Some(0.1), Some(1.0)], vec![Some(0.2), Some(2.0)]],
            vec![vec![Some(0.1), Some(1.1)], vec![Some(0.25), Some(2.1)]],
        ];
        assert!(matches!(bootstrap_from_raw(&raw, 0.0), Err(SpfError::Data(_))));

        let raw = vec![
            vec![vec![Some(0.1), Some(1.0)], vec![Some(0.2), Some(2.0)]],
            vec![vec![Some(0.1), Some(1.1)]],
        ];
        assert!(matches!(bootstrap_from_raw(&raw, 0.0), Err(SpfError::Data(_))));
    }

    #[test]
    fn empty_ensemble_is_rejected() {
        assert!(matches!(bootstrap_from_raw(&[], 0.0), Err(SpfError::Data(_))));
    }
}
