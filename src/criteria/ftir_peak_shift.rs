//! FTIR peak shift criterion: §4.3.3 of the specification.
//!
//! Locates the argmax bin of the latest spectrum and of the reference
//! spectrum; alarms when they diverge by more than `tolerance_bins`. If the
//! channel has no latest spectrum yet, produces no decision at all.

use crate::model::{AlarmDecision, AlarmKey, Severity};
use crate::store::StoreView;

use super::Criterion;

pub struct FtirPeakShiftCriterion {
    channel: String,
    tolerance_bins: usize,
    severity: Severity,
}

impl FtirPeakShiftCriterion {
    pub fn new(channel: impl Into<String>, tolerance_bins: usize, severity: Severity) -> Self {
        Self {
            channel: channel.into(),
            tolerance_bins,
            severity,
        }
    }
}

fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
        .map(|(idx, _)| idx)
}

impl Criterion for FtirPeakShiftCriterion {
    fn evaluate(&self, view: &StoreView) -> Vec<AlarmDecision> {
        let Some((latest, _)) = view.get_spectrum(&self.channel) else {
            return Vec::new();
        };
        let Some(reference) = view.get_reference_spectrum(&self.channel) else {
            return Vec::new();
        };
        let (Some(latest_peak), Some(ref_peak)) = (argmax(latest), argmax(reference)) else {
            return Vec::new();
        };

        let shift = latest_peak.abs_diff(ref_peak);
        let should_be_active = shift > self.tolerance_bins;
        vec![AlarmDecision {
            key: AlarmKey::new(self.channel.clone(), "FTIR_PEAK_SHIFT"),
            should_be_active,
            severity: self.severity,
            message: format!(
                "{} peak shifted {} bins (tolerance {})",
                self.channel, shift, self.tolerance_bins
            ),
            value: Some(shift as f64),
            details: Some(format!("latest_bin={latest_peak} ref_bin={ref_peak}")),
        }]
    }
}
