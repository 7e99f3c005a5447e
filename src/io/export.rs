//! Result packer: write a finished run to its output folder.
//!
//! Layout of `<output_path>/<identifier>/`:
//!
//! - `samples_structure.dat`: four `(start, end)` pairs splitting a sample record into
//!   params, SPF, correlator and chisq/dof
//! - `samples.dat`: one flat record per sample
//! - `phiUV.dat`: `omega/T  PhiUV/T^3`
//! - `spffit.dat`: `omega/T  SPF/T^3  err-  err+`
//! - `params.dat`: `param  err-  err+`, last row chisq/dof
//! - `corrfit.dat`: `tauT  corr(orig)  err(orig)  corr(fit)  err-  err+`
//! - `run.json`: run manifest
//!
//! All tables are plain whitespace-separated numbers with `#` comment headers.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BootstrapMode, CorrelatorData, FitConfig, SampleFailure, SpfModel, UvOrder};
use crate::error::SpfError;
use crate::fit::{RecordLayout, ResampleOutcome};
use crate::math::Estimate;

pub const STRUCTURE_FILE: &str = "samples_structure.dat";
pub const SAMPLES_FILE: &str = "samples.dat";
pub const MANIFEST_FILE: &str = "run.json";

/// Metadata stored next to the numeric tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub tool: String,
    pub created_at: DateTime<Utc>,
    pub identifier: String,
    pub model: SpfModel,
    pub uv_order: UvOrder,
    pub uv_coupling: Option<f64>,
    pub mode: BootstrapMode,
    pub nsamples: usize,
    pub nproc: usize,
    pub seed: u64,
    pub min_tau: f64,
    pub prevent_overfitting: bool,
    pub omega_min: f64,
    pub omega_max: f64,
    pub poisoned: Vec<usize>,
    pub failures: Vec<SampleFailure>,
}

/// Output folder name, e.g. `max_NLO_1000smpls_tauTgtr0.25_run2`.
pub fn file_identifier(
    model: &SpfModel,
    uv_order: UvOrder,
    nsamples: usize,
    min_tau: f64,
    suffix: Option<&str>,
) -> String {
    let suffix = suffix
        .filter(|s| !s.is_empty())
        .map(|s| format!("_{s}"))
        .unwrap_or_default();
    format!(
        "{}_{nsamples}smpls_tauTgtr{min_tau}{suffix}",
        model.identifier(uv_order)
    )
}

/// Write every output file into `dir` (created if missing).
pub fn write_run_output(
    dir: &Path,
    config: &FitConfig,
    data: &CorrelatorData,
    outcome: &ResampleOutcome,
    manifest: &RunManifest,
) -> Result<PathBuf, SpfError> {
    fs::create_dir_all(dir)
        .map_err(|e| SpfError::Io(format!("failed to create output folder '{}': {e}", dir.display())))?;

    let structure = outcome.layout.to_rows();
    write_table(
        &dir.join(STRUCTURE_FILE),
        "pairs (a, b) splitting each row of samples.dat as row[a..b]\nrows: params, spf, corr, chisq/dof",
        structure.iter().map(|(a, b)| format!("{a} {b}")),
    )?;

    write_table(
        &dir.join(SAMPLES_FILE),
        "one fit record per sample; NaN rows are poisoned or failed samples",
        outcome.records.iter().map(|r| fmt_row(r)),
    )?;

    let grid = config.uv.x();
    write_table(
        &dir.join("phiUV.dat"),
        "omega/T  PhiUV/T^3",
        grid.iter().zip(config.uv.y()).map(|(w, p)| fmt_row(&[*w, *p])),
    )?;

    let agg = &outcome.aggregate;
    write_table(
        &dir.join("spffit.dat"),
        "omega/T  SPF/T^3  err-  err+",
        grid.iter().zip(&agg.spf).map(|(w, e)| fmt_row(&estimate_row(*w, e))),
    )?;

    write_table(
        &dir.join("params.dat"),
        "first row: kappa/T^3, last row: chisq/dof, in between: model coefficients\nparam  err-  err+",
        agg.params
            .iter()
            .chain(std::iter::once(&agg.chisq_dof))
            .map(|e| fmt_row(&[e.central, e.err_low, e.err_high])),
    )?;

    write_table(
        &dir.join("corrfit.dat"),
        "tauT  corr(orig)  err(orig)  corr(fit)  err-  err+",
        data.tau.iter().enumerate().map(|(i, t)| {
            let fit = &agg.corr[i];
            fmt_row(&[
                *t,
                data.norm_mean[i],
                data.norm_err[i],
                fit.central,
                fit.err_low,
                fit.err_high,
            ])
        }),
    )?;

    let path = dir.join(MANIFEST_FILE);
    let file = File::create(&path)
        .map_err(|e| SpfError::Io(format!("failed to create '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), manifest)
        .map_err(|e| SpfError::Io(format!("failed to write '{}': {e}", path.display())))?;

    Ok(dir.to_path_buf())
}

/// Read back the record layout and per-sample records of a finished run.
pub fn read_samples(dir: &Path) -> Result<(RecordLayout, Vec<Vec<f64>>), SpfError> {
    let structure = read_table(&dir.join(STRUCTURE_FILE), 2)?;
    let rows: Vec<(usize, usize)> = structure
        .iter()
        .map(|r| (r[0] as usize, r[1] as usize))
        .collect();
    let layout = RecordLayout::from_rows(&rows)?;

    let records = read_table(&dir.join(SAMPLES_FILE), layout.len())?;
    if let Some((i, _)) = records.iter().enumerate().find(|(_, r)| r.len() != layout.len()) {
        return Err(SpfError::Data(format!("sample row {i} does not match the record structure")));
    }
    Ok((layout, records))
}

/// Read the manifest of a finished run.
pub fn read_manifest(dir: &Path) -> Result<RunManifest, SpfError> {
    let path = dir.join(MANIFEST_FILE);
    let file = File::open(&path).map_err(|e| SpfError::Io(format!("failed to open '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| SpfError::Data(format!("invalid manifest '{}': {e}", path.display())))
}

fn estimate_row(x: f64, e: &Estimate) -> [f64; 4] {
    [x, e.central, e.err_low, e.err_high]
}

fn fmt_row(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{v:22.15e}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_table<I>(path: &Path, header: &str, lines: I) -> Result<(), SpfError>
where
    I: IntoIterator<Item = String>,
{
    let io_err = |e: std::io::Error| SpfError::Io(format!("failed to write '{}': {e}", path.display()));
    let mut out = BufWriter::new(File::create(path).map_err(io_err)?);
    for h in header.lines() {
        writeln!(out, "# {h}").map_err(io_err)?;
    }
    for line in lines {
        writeln!(out, "{line}").map_err(io_err)?;
    }
    out.flush().map_err(io_err)
}

fn read_table(path: &Path, ncols: usize) -> Result<Vec<Vec<f64>>, SpfError> {
    let text = fs::read_to_string(path)
        .map_err(|e| SpfError::Io(format!("failed to read '{}': {e}", path.display())))?;
    crate::data::read_numeric_table(&text, ncols)
        .map_err(|e| SpfError::Data(format!("'{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AggregateResult, Ensemble, FitResult, SeriesBasis};
    use crate::test_support::config;

    fn est(v: f64) -> Estimate {
        Estimate {
            central: v,
            err_low: 0.1,
            err_high: 0.2,
        }
    }

    fn fixture() -> (FitConfig, CorrelatorData, ResampleOutcome, RunManifest) {
        let cfg = config(SpfModel::Max);
        let nomega = cfg.uv.x().len();
        let layout = RecordLayout::new(2, nomega, 3);
        let clean = FitResult {
            params: vec![2.0, 0.5],
            spf: vec![1.0; nomega],
            corr: vec![1.1, 1.2, 1.3],
            chisq_dof: 0.9,
        };
        let records = vec![
            layout.flatten(&clean).unwrap(),
            layout.flatten(&layout.poisoned()).unwrap(),
        ];
        let aggregate = AggregateResult {
            params: vec![est(2.0), est(0.5)],
            spf: vec![est(1.0); nomega],
            corr: vec![est(1.1), est(1.2), est(1.3)],
            chisq_dof: est(0.9),
        };
        let outcome = ResampleOutcome {
            layout,
            records,
            aggregate,
            poisoned: vec![1],
            failures: vec![],
        };
        let data = CorrelatorData {
            tau: vec![0.25, 0.35, 0.45],
            ensemble: Ensemble::Mock {
                mean: vec![1.0, 1.0, 1.0],
            },
            errors: vec![0.1; 3],
            norm_mean: vec![1.0, 1.1, 1.2],
            norm_err: vec![0.01; 3],
        };
        let manifest = RunManifest {
            tool: "spf".to_string(),
            created_at: Utc::now(),
            identifier: "max_NLO_2smpls_tauTgtr0".to_string(),
            model: SpfModel::Max,
            uv_order: UvOrder::Nlo,
            uv_coupling: Some(2.1),
            mode: BootstrapMode::Mock,
            nsamples: 2,
            nproc: 1,
            seed: 0,
            min_tau: 0.0,
            prevent_overfitting: false,
            omega_min: cfg.omega_min,
            omega_max: cfg.omega_max,
            poisoned: vec![1],
            failures: vec![],
        };
        (cfg, data, outcome, manifest)
    }

    #[test]
    fn identifier_includes_model_samples_and_suffix() {
        let f = SpfModel::Fourier {
            basis: SeriesBasis::Alpha,
            nmax: 4,
            constrain: true,
        };
        assert_eq!(
            file_identifier(&f, UvOrder::Nlo, 1000, 0.25, Some("run2")),
            "fourier_NLO_s2_alpha_4_1000smpls_tauTgtr0.25_run2"
        );
        assert_eq!(
            file_identifier(&SpfModel::Max, UvOrder::Lo, 10, 0.0, Some("")),
            "max_LO_10smpls_tauTgtr0"
        );
    }

    #[test]
    fn writes_all_files_and_reads_samples_back() {
        let (cfg, data, outcome, manifest) = fixture();
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(&manifest.identifier);
        write_run_output(&dir, &cfg, &data, &outcome, &manifest).unwrap();

        for name in [
            STRUCTURE_FILE,
            SAMPLES_FILE,
            "phiUV.dat",
            "spffit.dat",
            "params.dat",
            "corrfit.dat",
            MANIFEST_FILE,
        ] {
            assert!(dir.join(name).is_file(), "{name} missing");
        }

        let (layout, records) = read_samples(&dir).unwrap();
        assert_eq!(layout, outcome.layout);
        assert_eq!(records.len(), 2);
        let first = layout.unflatten(&records[0]).unwrap();
        assert!((first.params[0] - 2.0).abs() < 1e-14);
        assert!((first.chisq_dof - 0.9).abs() < 1e-14);
        assert!(records[1].iter().all(|v| v.is_nan()));

        let m = read_manifest(&dir).unwrap();
        assert_eq!(m.poisoned, vec![1]);
        assert_eq!(m.model, SpfModel::Max);
    }

    #[test]
    fn params_table_ends_with_chisq() {
        let (cfg, data, outcome, manifest) = fixture();
        let tmp = tempfile::tempdir().unwrap();
        write_run_output(tmp.path(), &cfg, &data, &outcome, &manifest).unwrap();
        let rows = read_table(&tmp.path().join("params.dat"), 3).unwrap();
        assert_eq!(rows.len(), 3);
        assert!((rows[2][0] - 0.9).abs() < 1e-14);
        let corr = read_table(&tmp.path().join("corrfit.dat"), 6).unwrap();
        assert_eq!(corr.len(), 3);
        assert!((corr[1][1] - 1.1).abs() < 1e-14);
    }
}
