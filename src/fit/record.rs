//! Flat per-sample records.
//!
//! Aggregation and persistence work on flat numeric rows
//! `[params.., spf.., corr.., chisq_dof]`. [`RecordLayout`] is the only place that
//! knows the positions; everything else handles named [`FitResult`] values.

use std::ops::Range;

use crate::domain::{AggregateResult, FitResult};
use crate::error::SpfError;
use crate::math::Estimate;

/// Cardinalities of the four record parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    pub nparam: usize,
    pub nomega: usize,
    pub nsep: usize,
}

impl RecordLayout {
    pub fn new(nparam: usize, nomega: usize, nsep: usize) -> Self {
        Self {
            nparam,
            nomega,
            nsep,
        }
    }

    /// Position ranges of params, SPF, correlator and chisq/dof, in that order.
    pub fn ranges(&self) -> [Range<usize>; 4] {
        let a = self.nparam;
        let b = a + self.nomega;
        let c = b + self.nsep;
        [0..a, a..b, b..c, c..c + 1]
    }

    pub fn len(&self) -> usize {
        self.nparam + self.nomega + self.nsep + 1
    }

    pub fn poisoned(&self) -> FitResult {
        FitResult::poisoned(self.nparam, self.nomega, self.nsep)
    }

    pub fn flatten(&self, result: &FitResult) -> Result<Vec<f64>, SpfError> {
        self.check_shape(result)?;
        let mut row = Vec::with_capacity(self.len());
        row.extend_from_slice(&result.params);
        row.extend_from_slice(&result.spf);
        row.extend_from_slice(&result.corr);
        row.push(result.chisq_dof);
        Ok(row)
    }

    pub fn unflatten(&self, row: &[f64]) -> Result<FitResult, SpfError> {
        let (params, spf, corr, chisq_dof) = self.split(row)?;
        Ok(FitResult {
            params,
            spf,
            corr,
            chisq_dof,
        })
    }

    /// Split a column-wise aggregate back into named parts.
    pub fn unflatten_estimates(&self, row: &[Estimate]) -> Result<AggregateResult, SpfError> {
        let (params, spf, corr, chisq_dof) = self.split(row)?;
        Ok(AggregateResult {
            params,
            spf,
            corr,
            chisq_dof,
        })
    }

    fn split<T: Copy>(&self, row: &[T]) -> Result<(Vec<T>, Vec<T>, Vec<T>, T), SpfError> {
        if row.len() != self.len() {
            return Err(SpfError::Data(format!(
                "record has {} entries, layout expects {}",
                row.len(),
                self.len()
            )));
        }
        let [p, s, c, x] = self.ranges();
        Ok((row[p].to_vec(), row[s].to_vec(), row[c].to_vec(), row[x.start]))
    }

    fn check_shape(&self, r: &FitResult) -> Result<(), SpfError> {
        if r.params.len() != self.nparam || r.spf.len() != self.nomega || r.corr.len() != self.nsep {
            return Err(SpfError::Data(format!(
                "result shape ({}, {}, {}) does not match layout ({}, {}, {})",
                r.params.len(),
                r.spf.len(),
                r.corr.len(),
                self.nparam,
                self.nomega,
                self.nsep
            )));
        }
        Ok(())
    }

    /// `(start, end)` pairs as stored in `samples_structure.dat`.
    pub fn to_rows(&self) -> [(usize, usize); 4] {
        self.ranges().map(|r| (r.start, r.end))
    }

    /// Rebuild a layout from stored `(start, end)` pairs.
    pub fn from_rows(rows: &[(usize, usize)]) -> Result<Self, SpfError> {
        let [p, s, c, x] = rows else {
            return Err(SpfError::Data(format!(
                "record structure needs 4 ranges, found {}",
                rows.len()
            )));
        };
        let contiguous = p.0 == 0 && p.1 == s.0 && s.1 == c.0 && c.1 == x.0 && x.1 == x.0 + 1;
        let ordered = p.0 <= p.1 && s.0 <= s.1 && c.0 <= c.1;
        if !(contiguous && ordered) {
            return Err(SpfError::Data(format!("inconsistent record structure {rows:?}")));
        }
        Ok(Self::new(p.1 - p.0, s.1 - s.0, c.1 - c.0))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn arb_result(nparam: usize, nomega: usize, nsep: usize) -> impl Strategy<Value = FitResult> {
        (
            prop::collection::vec(-1e6f64..1e6, nparam),
            prop::collection::vec(0f64..1e6, nomega),
            prop::collection::vec(0f64..1e3, nsep),
            0f64..100.0,
        )
            .prop_map(|(params, spf, corr, chisq_dof)| FitResult {
                params,
                spf,
                corr,
                chisq_dof,
            })
    }

    proptest! {
        #[test]
        fn flatten_then_unflatten_is_identity(
            (layout, result) in (1usize..12, 1usize..300, 1usize..40)
                .prop_flat_map(|(p, o, s)| (Just(RecordLayout::new(p, o, s)), arb_result(p, o, s)))
        ) {
            let row = layout.flatten(&result).unwrap();
            prop_assert_eq!(row.len(), layout.len());
            prop_assert_eq!(layout.unflatten(&row).unwrap(), result);
        }

        #[test]
        fn stored_rows_rebuild_the_layout(p in 0usize..20, o in 0usize..500, s in 0usize..60) {
            let layout = RecordLayout::new(p, o, s);
            prop_assert_eq!(RecordLayout::from_rows(&layout.to_rows()).unwrap(), layout);
        }
    }

    #[test]
    fn ranges_are_contiguous() {
        let l = RecordLayout::new(3, 5, 2);
        assert_eq!(l.ranges(), [0..3, 3..8, 8..10, 10..11]);
        assert_eq!(l.len(), 11);
    }

    #[test]
    fn poisoned_record_is_all_nan() {
        let l = RecordLayout::new(2, 4, 3);
        let row = l.flatten(&l.poisoned()).unwrap();
        assert_eq!(row.len(), 10);
        assert!(row.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let l = RecordLayout::new(2, 4, 3);
        assert!(l.unflatten(&[0.0; 9]).is_err());
        let r = FitResult::poisoned(3, 4, 3);
        assert!(l.flatten(&r).is_err());
        assert!(RecordLayout::from_rows(&[(0, 2), (3, 5), (5, 6), (6, 7)]).is_err());
    }
}
