use std::path::PathBuf;

use mediastack_core::config::DiskConfig;
use mediastack_core::{ProbeResult, Verdict};

use crate::disk::FreeSpace;
use crate::Probe;

const GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Free-space headroom on the media volume.
pub struct DiskProbe<'a> {
    path: PathBuf,
    thresholds: DiskConfig,
    space: &'a dyn FreeSpace,
}

impl<'a> DiskProbe<'a> {
    pub fn new(path: PathBuf, thresholds: DiskConfig, space: &'a dyn FreeSpace) -> Self {
        Self {
            path,
            thresholds,
            space,
        }
    }
}

/// Above the warn line passes, below the fail line fails, warn in between.
pub fn classify_free_space(available: u64, thresholds: &DiskConfig) -> Verdict {
    if available > thresholds.warn_below_bytes() {
        Verdict::Pass
    } else if available < thresholds.fail_below_bytes() {
        Verdict::Fail
    } else {
        Verdict::Warn
    }
}

impl Probe for DiskProbe<'_> {
    fn name(&self) -> String {
        "disk".to_string()
    }

    fn run(&self) -> ProbeResult {
        match self.space.available_bytes(&self.path) {
            Ok(bytes) => ProbeResult::new(
                self.name(),
                classify_free_space(bytes, &self.thresholds),
                format!(
                    "{:.1} GB free on {}",
                    bytes as f64 / GB,
                    self.path.display()
                ),
            ),
            Err(reason) => ProbeResult::fail(self.name(), format!("free space unknown: {reason}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const GIB: u64 = 1024 * 1024 * 1024;

    #[rstest]
    #[case(20 * GIB, Verdict::Pass)]
    #[case(5 * GIB + 1, Verdict::Pass)]
    #[case(5 * GIB, Verdict::Warn)]
    #[case(3 * GIB, Verdict::Warn)]
    #[case(GIB, Verdict::Warn)]
    #[case(GIB / 2, Verdict::Fail)]
    #[case(0, Verdict::Fail)]
    fn free_space_thresholds(#[case] available: u64, #[case] expected: Verdict) {
        assert_eq!(classify_free_space(available, &DiskConfig::default()), expected);
    }
}
