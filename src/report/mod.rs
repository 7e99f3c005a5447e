//! Formatted terminal output.
//!
//! Formatting lives here so the fitting code stays free of presentation concerns.

use std::path::Path;

use crate::domain::{AggregateResult, SampleFailure, SpfModel, UvOrder};
use crate::math::Estimate;

/// Counts and context printed above the parameter table.
#[derive(Debug, Clone)]
pub struct RunSummary<'a> {
    pub model: &'a SpfModel,
    pub uv_order: UvOrder,
    pub nsamples: usize,
    pub poisoned: &'a [usize],
    pub failures: &'a [SampleFailure],
    pub output_dir: Option<&'a Path>,
}

/// Format the full run summary (model, sample counts, parameters, chisq/dof).
pub fn format_run_summary(summary: &RunSummary<'_>, aggregate: &AggregateResult) -> String {
    let mut out = String::new();

    out.push_str("=== spf - spectral function fit ===\n");
    out.push_str(&format!(
        "Model: {} ({})\n",
        summary.model.display_name(),
        summary.model.identifier(summary.uv_order)
    ));
    let (poisoned, failed) = (summary.poisoned.len(), summary.failures.len());
    out.push_str(&format!(
        "Samples: n={} | used={} | poisoned={poisoned} | failed={failed}\n",
        summary.nsamples,
        summary.nsamples.saturating_sub(poisoned + failed),
    ));
    if !summary.poisoned.is_empty() {
        out.push_str(&format!("Poisoned samples: {}\n", fmt_indices(summary.poisoned)));
    }
    for f in summary.failures {
        out.push_str(&format!("  (failed) {f}\n"));
    }
    if let Some(dir) = summary.output_dir {
        out.push_str(&format!("Output: {}\n", dir.display()));
    }

    out.push('\n');
    out.push_str(&format_param_table(&aggregate.params, &aggregate.chisq_dof));
    out
}

/// Parameter table with asymmetric errors; first row is `kappa/T^3`, last is chisq/dof.
pub fn format_param_table(params: &[Estimate], chisq_dof: &Estimate) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<12} {:>14} {:>12} {:>12}\n", "param", "value", "err-", "err+"));
    out.push_str(&format!("{:-<12} {:-<14} {:-<12} {:-<12}\n", "", "", "", ""));

    for (i, p) in params.iter().enumerate() {
        let name = if i == 0 { "kappa/T^3".to_string() } else { format!("c_{i}") };
        out.push_str(&fmt_row(&name, p));
    }
    out.push_str(&fmt_row("chisq/dof", chisq_dof));
    out
}

fn fmt_row(name: &str, e: &Estimate) -> String {
    format!("{name:<12} {:>14.6e} {:>12.3e} {:>12.3e}\n", e.central, e.err_low, e.err_high)
}

fn fmt_indices(indices: &[usize]) -> String {
    const SHOWN: usize = 20;
    let mut parts: Vec<String> = indices.iter().take(SHOWN).map(|i| i.to_string()).collect();
    if indices.len() > SHOWN {
        parts.push(format!("... ({} more)", indices.len() - SHOWN));
    }
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn est(c: f64) -> Estimate {
        Estimate {
            central: c,
            err_low: 0.01,
            err_high: 0.02,
        }
    }

    #[test]
    fn param_table_labels_kappa_coefficients_and_chisq() {
        let table = format_param_table(&[est(1.5), est(-0.25)], &est(0.8));
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[2].starts_with("kappa/T^3"));
        assert!(lines[3].starts_with("c_1"));
        assert!(lines[4].starts_with("chisq/dof"));
        assert!(lines[2].contains("1.500000e0"));
    }

    #[test]
    fn summary_counts_poisoned_and_failed_samples() {
        let failures = vec![SampleFailure {
            index: 3,
            message: "data error: x".to_string(),
        }];
        let summary = RunSummary {
            model: &SpfModel::Max,
            uv_order: UvOrder::Nlo,
            nsamples: 10,
            poisoned: &[1],
            failures: &failures,
            output_dir: None,
        };
        let aggregate = AggregateResult {
            params: vec![est(1.0)],
            spf: vec![],
            corr: vec![],
            chisq_dof: est(1.1),
        };
        let text = format_run_summary(&summary, &aggregate);
        assert!(text.contains("Model: max (max_NLO)"));
        assert!(text.contains("used=8 | poisoned=1 | failed=1"));
        assert!(text.contains("Poisoned samples: [1]"));
        assert!(text.contains("(failed) sample 3: data error: x"));
    }

    #[test]
    fn long_index_lists_are_truncated() {
        let idx: Vec<usize> = (0..25).collect();
        assert!(fmt_indices(&idx).ends_with("... (5 more)]"));
    }
}
