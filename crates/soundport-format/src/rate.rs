use serde::{Deserialize, Serialize};

/// Lowest sample rate any backend is asked to handle.
pub const MIN_SAMPLE_RATE: u32 = 8000;
/// Highest sample rate any backend is asked to handle.
pub const MAX_SAMPLE_RATE: u32 = 5_644_800;

/// Inclusive range of sample rates a device accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleRateRange {
    pub min: u32,
    pub max: u32,
}

impl SampleRateRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// A range holding exactly one rate.
    pub const fn single(rate: u32) -> Self {
        Self { min: rate, max: rate }
    }

    /// The full range every backend must accept.
    pub const fn full() -> Self {
        Self { min: MIN_SAMPLE_RATE, max: MAX_SAMPLE_RATE }
    }

    pub fn contains(&self, rate: u32) -> bool {
        self.min <= rate && rate <= self.max
    }
}

/// Smallest rate in `ranges` at or above `rate`, else the largest rate on offer.
pub fn nearest_sample_rate(ranges: &[SampleRateRange], rate: u32) -> Option<u32> {
    let at_or_above = ranges
        .iter()
        .filter(|r| r.max >= rate)
        .map(|r| rate.max(r.min))
        .min();
    at_or_above.or_else(|| ranges.iter().map(|r| r.max).max())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_inclusive() {
        let range = SampleRateRange::new(44100, 48000);
        assert!(range.contains(44100));
        assert!(range.contains(48000));
        assert!(!range.contains(44099));
        assert!(!range.contains(48001));
    }

    #[test]
    fn test_nearest_sample_rate() {
        let ranges = [SampleRateRange::single(44100), SampleRateRange::new(88200, 96000)];
        assert_eq!(nearest_sample_rate(&ranges, 44100), Some(44100));
        assert_eq!(nearest_sample_rate(&ranges, 48000), Some(88200));
        assert_eq!(nearest_sample_rate(&ranges, 90000), Some(90000));
        assert_eq!(nearest_sample_rate(&ranges, 192000), Some(96000));
        assert_eq!(nearest_sample_rate(&ranges, 8000), Some(44100));
        assert_eq!(nearest_sample_rate(&[], 48000), None);
    }
}
