//! Unit tests for the Temporal module

use chrono::{TimeZone, Utc};
use core_kernel::{WorkPeriod, TemporalError};
use proptest::prelude::*;

mod work_period {
    use super::*;

    #[test]
    fn test_new_accepts_ordered_bounds() {
        let start = Utc.with_ymd_and_hms(2024, 5, 6, 18, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 7, 2, 0, 0).unwrap();
        let period = WorkPeriod::new(start, end).unwrap();

        assert_eq!(period.start, start);
        assert_eq!(period.end, end);
        assert_eq!(period.whole_hours(), 8);
    }

    #[test]
    fn test_new_accepts_empty_period() {
        let start = Utc.with_ymd_and_hms(2024, 5, 6, 18, 0, 0).unwrap();
        let period = WorkPeriod::new(start, start).unwrap();
        assert_eq!(period.whole_hours(), 0);
    }

    #[test]
    fn test_new_rejects_reversed_bounds() {
        let start = Utc.with_ymd_and_hms(2024, 5, 7, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap();
        let result = WorkPeriod::new(start, end);

        assert!(matches!(result, Err(TemporalError::InvalidPeriod { .. })));
    }
}

proptest! {
    #[test]
    fn whole_hours_matches_minutes(start_min in 0i64..100_000, len_min in 0i64..10_000) {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let start = base + chrono::Duration::minutes(start_min);
        let end = start + chrono::Duration::minutes(len_min);
        let period = WorkPeriod::new(start, end).unwrap();
        prop_assert_eq!(i64::from(period.whole_hours()), len_min / 60);
    }
}
