//! Staleness classification of cached tiles.
//!
//! Tiles do not expire by wall-clock time. Each rendered tile records the
//! generation counter it was produced at, and the modification ledger records
//! the latest generation that touched its cell. The gap between the two
//! decides whether the tile can be shown.
//!
//! ```text
//! latest - cached <= 0            → Actual      (show, no refill)
//! 0 < latest - cached <= window   → Outdated    (show, refill)
//! latest - cached > window        → Irrelevant  (hide, refill)
//! ```

use std::fmt;

/// Default number of generations a tile may lag and still be shown.
pub const DEFAULT_STALENESS_TOLERANCE: u64 = 5;

/// Freshness of a cached tile relative to the modification ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Staleness {
    /// No newer modification touched the cell.
    Actual,
    /// Newer data exists but within the tolerance window.
    Outdated,
    /// The tile lags too far behind to be shown.
    Irrelevant,
}

impl Staleness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Staleness::Actual => "actual",
            Staleness::Outdated => "outdated",
            Staleness::Irrelevant => "irrelevant",
        }
    }

    /// Whether the cached pixels may be composited.
    pub fn is_displayable(&self) -> bool {
        !matches!(self, Staleness::Irrelevant)
    }

    /// Whether a refill should be scheduled.
    pub fn needs_refill(&self) -> bool {
        !matches!(self, Staleness::Actual)
    }
}

impl fmt::Display for Staleness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Thresholds for staleness classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    /// Maximum lag, in generations, of a displayable tile.
    pub tolerance: u64,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_STALENESS_TOLERANCE,
        }
    }
}

impl StalenessPolicy {
    pub fn new(tolerance: u64) -> Self {
        Self { tolerance }
    }

    /// Classify a tile produced at `cached` against the ledger's `latest`.
    pub fn classify(&self, cached: u64, latest: u64) -> Staleness {
        match latest.checked_sub(cached) {
            None | Some(0) => Staleness::Actual,
            Some(lag) if lag <= self.tolerance => Staleness::Outdated,
            Some(_) => Staleness::Irrelevant,
        }
    }

    /// Classify a 32-bit header stamp against the ledger's `latest`.
    ///
    /// Tile headers keep only the low 32 bits of the generation, so the lag
    /// is taken modulo 2^32. A lag in the upper half of that range means the
    /// stamp is ahead of the ledger.
    pub fn classify_stamp(&self, stamp: u32, latest: u64) -> Staleness {
        let lag = (latest as u32).wrapping_sub(stamp);
        if lag == 0 || lag > u32::MAX / 2 {
            Staleness::Actual
        } else if u64::from(lag) <= self.tolerance {
            Staleness::Outdated
        } else {
            Staleness::Irrelevant
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_tolerance() {
        assert_eq!(StalenessPolicy::default().tolerance, 5);
    }

    #[test]
    fn test_boundaries() {
        let policy = StalenessPolicy::default();
        assert_eq!(policy.classify(10, 9), Staleness::Actual);
        assert_eq!(policy.classify(10, 10), Staleness::Actual);
        assert_eq!(policy.classify(10, 11), Staleness::Outdated);
        assert_eq!(policy.classify(10, 15), Staleness::Outdated);
        assert_eq!(policy.classify(10, 16), Staleness::Irrelevant);
    }

    #[test]
    fn test_zero_tolerance() {
        let policy = StalenessPolicy::new(0);
        assert_eq!(policy.classify(4, 4), Staleness::Actual);
        assert_eq!(policy.classify(4, 5), Staleness::Irrelevant);
    }

    #[test]
    fn test_display_and_flags() {
        assert_eq!(Staleness::Outdated.to_string(), "outdated");
        assert!(Staleness::Outdated.is_displayable());
        assert!(Staleness::Outdated.needs_refill());
        assert!(!Staleness::Irrelevant.is_displayable());
        assert!(!Staleness::Actual.needs_refill());
    }

    #[test]
    fn test_stamp_across_u32_wrap() {
        let policy = StalenessPolicy::default();
        let wrapped = u64::from(u32::MAX) + 3;

        assert_eq!(policy.classify_stamp(wrapped as u32, wrapped), Staleness::Actual);
        assert_eq!(policy.classify_stamp(u32::MAX, wrapped), Staleness::Outdated);
        assert_eq!(policy.classify_stamp(u32::MAX - 3, wrapped), Staleness::Irrelevant);
        assert_eq!(policy.classify_stamp(3, wrapped - 1), Staleness::Actual);
    }

    proptest! {
        #[test]
        fn prop_classification_matches_thresholds(
            cached in 0u64..1_000_000,
            latest in 0u64..1_000_000,
            tolerance in 0u64..20,
        ) {
            let staleness = StalenessPolicy::new(tolerance).classify(cached, latest);
            let expected = if latest <= cached {
                Staleness::Actual
            } else if latest - cached <= tolerance {
                Staleness::Outdated
            } else {
                Staleness::Irrelevant
            };
            prop_assert_eq!(staleness, expected);
        }

        #[test]
        fn prop_stamp_matches_full_width_below_wrap(
            cached in 0u64..1_000_000,
            latest in 0u64..1_000_000,
            tolerance in 0u64..20,
        ) {
            let policy = StalenessPolicy::new(tolerance);
            prop_assert_eq!(
                policy.classify_stamp(cached as u32, latest),
                policy.classify(cached, latest)
            );
        }
    }
}
