//! Scheduling priority for fill jobs.
//!
//! Priorities are plain integers where higher values run first. The
//! orchestrator derives them from how close a tile lies to the centre of the
//! view, so the tiles the user is looking at fill before the edges.
//!
//! # Example
//!
//! ```
//! use sonarlayer::executor::Priority;
//!
//! let center = Priority::from_distance(0.0);
//! let edge = Priority::from_distance(3.5);
//!
//! assert_eq!(center, Priority::CENTER);
//! assert!(center > edge);
//! ```

/// Priority value of a tile at the view centre.
pub const PRIORITY_CENTER: i32 = 0;

/// Resolution of distance-derived priorities (steps per tile).
pub const PRIORITY_STEPS_PER_TILE: f64 = 100.0;

/// Fill job scheduling priority.
///
/// Higher values are scheduled first; equal priorities are served in push
/// order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i32);

impl Priority {
    /// A tile at the centre of the view.
    pub const CENTER: Priority = Priority(PRIORITY_CENTER);

    /// Creates a new priority with the given value.
    ///
    /// Higher values mean higher priority.
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    /// Priority of a tile `distance` tile widths away from the view centre.
    ///
    /// Non-finite or negative distances map to [`Priority::CENTER`].
    pub fn from_distance(distance: f64) -> Self {
        if !distance.is_finite() || distance <= 0.0 {
            return Self::CENTER;
        }
        let steps = (distance * PRIORITY_STEPS_PER_TILE).round();
        let steps = steps.min((i32::MAX - 1) as f64) as i32;
        Self(PRIORITY_CENTER - steps)
    }

    /// Returns the numeric priority value.
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::CENTER
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::CENTER => write!(f, "Center(0)"),
            Self(v) => write!(f, "Priority({})", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::new(5) > Priority::CENTER);
        assert!(Priority::CENTER > Priority::new(-1));
    }

    #[test]
    fn test_priority_default() {
        assert_eq!(Priority::default(), Priority::CENTER);
    }

    #[test]
    fn test_from_distance_decreases() {
        let near = Priority::from_distance(0.5);
        let far = Priority::from_distance(2.0);
        assert_eq!(near.value(), -50);
        assert_eq!(far.value(), -200);
        assert!(near > far);
    }

    #[test]
    fn test_from_distance_degenerate() {
        assert_eq!(Priority::from_distance(-1.0), Priority::CENTER);
        assert_eq!(Priority::from_distance(f64::NAN), Priority::CENTER);
        assert_eq!(Priority::from_distance(f64::INFINITY), Priority::CENTER);
        assert_eq!(Priority::from_distance(1e30).value(), -(i32::MAX - 1));
    }

    #[test]
    fn test_priority_display() {
        assert_eq!(format!("{}", Priority::CENTER), "Center(0)");
        assert_eq!(format!("{}", Priority::new(-42)), "Priority(-42)");
    }
}
