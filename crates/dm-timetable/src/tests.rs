//! Unit tests for dm-timetable.

#[cfg(test)]
mod timetable {
    use dm_core::Tick;

    use crate::{Timetable, TimetableError};

    fn week() -> Timetable {
        Timetable::new(vec![1, 5, 2, 8, 3, 4], 10).unwrap()
    }

    #[test]
    fn empty_is_rejected() {
        assert!(matches!(Timetable::new(vec![], 10), Err(TimetableError::Empty { .. })));
    }

    #[test]
    fn demand_is_cyclic() {
        let t = week();
        assert_eq!(t.demand_at(Tick(1)), 5);
        assert_eq!(t.demand_at(Tick(7)), 5);
        assert_eq!(t.demand_at(Tick(600)), 1);
    }

    #[test]
    fn window_within_table() {
        let t = week();
        assert_eq!(t.max_demand_over(Tick(0), 3), 5);
        assert_eq!(t.max_demand_over(Tick(4), 2), 4);
    }

    #[test]
    fn window_wraps_tail_and_head() {
        let t = week();
        // slots 4, 5, 0, 1
        assert_eq!(t.max_demand_over(Tick(4), 4), 5);
        // slots 5, 0
        assert_eq!(t.max_demand_over(Tick(11), 2), 4);
    }

    #[test]
    fn degenerate_windows() {
        let t = week();
        assert_eq!(t.max_demand_over(Tick(2), 0), 2);
        assert_eq!(t.max_demand_over(Tick(2), 6), 8);
        assert_eq!(t.max_demand_over(Tick(2), 100), 8);
    }

    #[test]
    fn capacity_can_go_negative() {
        let t = Timetable::new(vec![8, 12], 10).unwrap();
        assert_eq!(t.available_capacity(Tick(0)), 2);
        assert_eq!(t.available_capacity(Tick(1)), -2);
        assert_eq!(t.max_future_capacity(Tick(0), 2), -2);
    }

    #[test]
    fn peak_where_filters_slots() {
        let t = week();
        assert_eq!(t.peak_where(|tick| tick.0 % 2 == 0), Some(3));
        assert_eq!(t.peak_where(|_| false), None);
    }
}

#[cfg(test)]
mod window {
    use dm_core::{Calendar, Tick, Weekday};

    use crate::{DailyRanges, InjectionWindow, TimetableError};

    #[test]
    fn always_blocked_is_rejected() {
        assert!(matches!(InjectionWindow::new(vec![true, true]), Err(TimetableError::NeverClear)));
        assert!(InjectionWindow::new(vec![]).is_err());
    }

    #[test]
    fn next_clear_skips_blackout_and_wraps() {
        let w = InjectionWindow::new(vec![false, true, true, false]).unwrap();
        assert_eq!(w.next_clear(Tick(0)), Tick(0));
        assert_eq!(w.next_clear(Tick(1)), Tick(3));
        assert_eq!(w.next_clear(Tick(5)), Tick(7));
        assert!(w.is_blackout(Tick(6)));
    }

    #[test]
    fn daily_ranges_repeat_every_day() {
        let cal = Calendar::new(24, Weekday::Monday);
        let ranges = DailyRanges(vec![(5.0, 7.0)]);
        let w = InjectionWindow::from_daily(&ranges, &cal, 48).unwrap();
        assert!(!w.is_blackout(Tick(4)));
        assert!(w.is_blackout(Tick(5)));
        assert!(w.is_blackout(Tick(6)));
        assert!(!w.is_blackout(Tick(7)));
        assert!(w.is_blackout(Tick(29)));
    }

    #[test]
    fn inverted_hours_are_rejected() {
        let cal = Calendar::default();
        let ranges = DailyRanges(vec![(9.0, 8.0)]);
        assert!(matches!(
            InjectionWindow::from_daily(&ranges, &cal, 96),
            Err(TimetableError::InvalidHours { .. })
        ));
    }
}

#[cfg(test)]
mod profile {
    use dm_core::{Calendar, Tick, Weekday};

    use crate::{WeeklyProfile, is_peak};

    #[test]
    fn peaks_are_weekday_mornings_and_evenings() {
        let cal = Calendar::new(24, Weekday::Monday);
        assert!(!is_peak(&cal, Tick(4)));
        assert!(is_peak(&cal, Tick(5)));
        assert!(is_peak(&cal, Tick(9)));
        assert!(!is_peak(&cal, Tick(10)));
        assert!(is_peak(&cal, Tick(17)));
        // Saturday 08:00
        assert!(!is_peak(&cal, Tick(5 * 24 + 8)));
    }

    #[test]
    fn generated_week_has_three_levels() {
        let cal = Calendar::new(24, Weekday::Monday);
        let p = WeeklyProfile { weekday_peak: 120, weekday_off_peak: 90, weekend_level: 80 };
        let slots = p.generate(&cal);
        assert_eq!(slots.len(), 168);
        assert_eq!(slots[6], 120);
        assert_eq!(slots[12], 90);
        assert_eq!(slots[6 * 24 + 6], 80);
        assert_eq!(slots.iter().filter(|d| **d == 120).count(), 5 * 8);
    }

    #[test]
    fn generation_follows_start_weekday() {
        let cal = Calendar::new(24, Weekday::Saturday);
        let p = WeeklyProfile { weekday_peak: 3, weekday_off_peak: 2, weekend_level: 1 };
        let slots = p.generate(&cal);
        assert!(slots[..48].iter().all(|d| *d == 1));
        assert_eq!(slots[48 + 6], 3);
    }
}
