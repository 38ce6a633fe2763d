//! Storage usage snapshots and their display classification.
//!
//! Usage is derived on demand from a single-level namespace listing and never persisted. Files
//! inside sub-directories are not counted because the contents API lists one directory at a time.

use crate::constants::{
    BYTES_PER_MEGABYTE, CRITICAL_THRESHOLD_PERCENT, WARNING_THRESHOLD_PERCENT,
};
use crate::{FileItem, FileKind};
use serde::Serialize;

/// Bytes used by a namespace against its quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub used_bytes: u64,
    pub quota_bytes: u64,
}

/// Display tier for a usage percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageSeverity {
    /// Below 70%.
    Normal,
    /// 70% to 90% inclusive.
    Warning,
    /// Above 90%.
    Critical,
}

impl UsageSnapshot {
    pub fn new(used_bytes: u64, quota_bytes: u64) -> Self {
        Self {
            used_bytes,
            quota_bytes,
        }
    }

    /// Sums the sizes of the file entries in one listing; directories are skipped.
    pub fn from_items(items: &[FileItem], quota_bytes: u64) -> Self {
        let used_bytes = items
            .iter()
            .filter(|item| item.kind == FileKind::File)
            .filter_map(|item| item.size_bytes)
            .fold(0u64, u64::saturating_add);
        Self::new(used_bytes, quota_bytes)
    }

    /// Fraction of the quota in use, clamped to `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.quota_bytes == 0 {
            return if self.used_bytes == 0 { 0.0 } else { 1.0 };
        }
        (self.used_bytes as f64 / self.quota_bytes as f64).clamp(0.0, 1.0)
    }

    /// Whole-number percentage of the quota in use, rounded and clamped to `0..=100`.
    pub fn percentage(&self) -> u8 {
        (self.fraction() * 100.0).round() as u8
    }

    pub fn severity(&self) -> UsageSeverity {
        UsageSeverity::for_percentage(self.percentage())
    }

    /// Used space in megabytes, rounded to two decimals.
    pub fn used_megabytes(&self) -> f64 {
        to_megabytes(self.used_bytes)
    }

    /// Quota in megabytes, rounded to two decimals.
    pub fn quota_megabytes(&self) -> f64 {
        to_megabytes(self.quota_bytes)
    }
}

impl UsageSeverity {
    pub fn for_percentage(percentage: u8) -> Self {
        if percentage > CRITICAL_THRESHOLD_PERCENT {
            UsageSeverity::Critical
        } else if percentage >= WARNING_THRESHOLD_PERCENT {
            UsageSeverity::Warning
        } else {
            UsageSeverity::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UsageSeverity::Normal => "normal",
            UsageSeverity::Warning => "warning",
            UsageSeverity::Critical => "critical",
        }
    }
}

fn to_megabytes(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MEGABYTE as f64 * 100.0).round() / 100.0
}
