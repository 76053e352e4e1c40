use std::collections::{BTreeMap, HashSet};

use chrono::{NaiveDate, Timelike};
use tracing::debug;

use crate::models::{DailyMetric, EnrichedPlay};

/// Local hours counted as late-night listening (23:00 through 04:59).
pub const LATE_NIGHT_HOURS: [u32; 6] = [23, 0, 1, 2, 3, 4];

#[derive(Default)]
struct DayAccumulator<'a> {
    weighted_valence: f64,
    weighted_energy: f64,
    total_duration_ms: f64,
    valence_sum: f64,
    energy_sum: f64,
    tracks: HashSet<&'a str>,
    late_night: usize,
    count: usize,
}

impl<'a> DayAccumulator<'a> {
    fn add(&mut self, item: &'a EnrichedPlay) {
        let duration = item.play.duration_ms as f64;
        self.weighted_valence += item.features.valence * duration;
        self.weighted_energy += item.features.energy * duration;
        self.total_duration_ms += duration;
        self.valence_sum += item.features.valence;
        self.energy_sum += item.features.energy;
        self.tracks.insert(item.play.track_id.as_str());
        if is_late_night(item.play.played_at.hour()) {
            self.late_night += 1;
        }
        self.count += 1;
    }

    fn finish(self, date: NaiveDate) -> DailyMetric {
        let count = self.count as f64;
        let (valence, energy) = if self.total_duration_ms == 0.0 {
            debug!(%date, "zero listening duration, using unweighted means");
            (self.valence_sum / count, self.energy_sum / count)
        } else {
            let total = self.total_duration_ms;
            (self.weighted_valence / total, self.weighted_energy / total)
        };

        DailyMetric {
            date,
            valence,
            energy,
            count: self.count,
            listening_time_minutes: self.total_duration_ms / 60_000.0,
            diversity: self.tracks.len() as f64 / count,
            late_night_ratio: self.late_night as f64 / count,
        }
    }
}

pub fn is_late_night(hour: u32) -> bool {
    LATE_NIGHT_HOURS.contains(&hour)
}

pub fn aggregate(enriched: &[EnrichedPlay]) -> Vec<DailyMetric> {
    let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

    for item in enriched {
        days.entry(item.play.played_at.date_naive())
            .or_default()
            .add(item);
    }

    days.into_iter()
        .map(|(date, acc)| acc.finish(date))
        .collect()
}

pub fn total_listening_minutes(metrics: &[DailyMetric]) -> f64 {
    metrics.iter().map(|m| m.listening_time_minutes).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::enriched;

    #[test]
    fn weights_mood_by_duration() {
        let plays = vec![
            enriched("long", "2026-03-01T10:00:00+00:00", 240_000, 0.8, 0.6),
            enriched("skip", "2026-03-01T10:05:00+00:00", 15_000, 0.0, 0.0),
        ];

        let metrics = aggregate(&plays);
        assert_eq!(metrics.len(), 1);
        let day = &metrics[0];
        let expected_valence = (0.8 * 240_000.0) / 255_000.0;
        assert!((day.valence - expected_valence).abs() < 1e-9);
        assert!((day.energy - (0.6 * 240_000.0) / 255_000.0).abs() < 1e-9);
        assert_eq!(day.count, 2);
        assert!((day.listening_time_minutes - 4.25).abs() < 1e-9);
    }

    #[test]
    fn zero_duration_day_falls_back_to_plain_mean() {
        let plays = vec![
            enriched("a", "2026-03-01T10:00:00+00:00", 0, 0.2, 0.4),
            enriched("b", "2026-03-01T11:00:00+00:00", 0, 0.6, 0.8),
        ];

        let day = &aggregate(&plays)[0];
        assert!((day.valence - 0.4).abs() < 1e-9);
        assert!((day.energy - 0.6).abs() < 1e-9);
        assert!(day.valence.is_finite() && day.energy.is_finite());
        assert_eq!(day.listening_time_minutes, 0.0);
    }

    #[test]
    fn huge_durations_do_not_overflow() {
        let half = u64::MAX / 2 + 1;
        let plays = vec![
            enriched("a", "2026-03-01T10:00:00+00:00", half, 0.4, 0.2),
            enriched("b", "2026-03-01T11:00:00+00:00", half, 0.6, 0.8),
        ];

        let day = &aggregate(&plays)[0];
        assert!((day.valence - 0.5).abs() < 1e-9);
        assert!((day.energy - 0.5).abs() < 1e-9);
        assert!(day.listening_time_minutes.is_finite());
        assert!(day.listening_time_minutes > 0.0);
    }

    #[test]
    fn diversity_counts_distinct_tracks() {
        let plays = vec![
            enriched("a", "2026-03-01T10:00:00+00:00", 1000, 0.5, 0.5),
            enriched("a", "2026-03-01T10:10:00+00:00", 1000, 0.5, 0.5),
            enriched("a", "2026-03-01T10:20:00+00:00", 1000, 0.5, 0.5),
            enriched("b", "2026-03-01T10:30:00+00:00", 1000, 0.5, 0.5),
        ];

        assert!((aggregate(&plays)[0].diversity - 0.5).abs() < 1e-9);
    }

    #[test]
    fn late_night_window_wraps_midnight() {
        assert!(is_late_night(23));
        assert!(is_late_night(0));
        assert!(is_late_night(4));
        assert!(!is_late_night(5));
        assert!(!is_late_night(22));

        let plays = vec![
            enriched("a", "2026-03-01T00:30:00+00:00", 1000, 0.5, 0.5),
            enriched("b", "2026-03-01T04:59:00+00:00", 1000, 0.5, 0.5),
            enriched("c", "2026-03-01T05:00:00+00:00", 1000, 0.5, 0.5),
            enriched("d", "2026-03-01T23:15:00+00:00", 1000, 0.5, 0.5),
        ];
        assert!((aggregate(&plays)[0].late_night_ratio - 0.75).abs() < 1e-9);
    }

    #[test]
    fn groups_by_local_date_and_sorts() {
        let plays = vec![
            enriched("a", "2026-03-03T12:00:00+00:00", 1000, 0.5, 0.5),
            // 01:30 local on the 2nd, still the 1st in UTC
            enriched("b", "2026-03-02T01:30:00+02:00", 1000, 0.5, 0.5),
            enriched("c", "2026-03-01T12:00:00+00:00", 1000, 0.5, 0.5),
            enriched("d", "2026-03-03T13:00:00+00:00", 1000, 0.5, 0.5),
        ];

        let metrics = aggregate(&plays);
        let dates: Vec<String> = metrics.iter().map(|m| m.date.to_string()).collect();
        assert_eq!(dates, vec!["2026-03-01", "2026-03-02", "2026-03-03"]);
        assert_eq!(metrics[1].late_night_ratio, 1.0);
        assert_eq!(metrics[2].count, 2);
    }

    #[test]
    fn weighted_means_stay_in_unit_range() {
        let plays = vec![
            enriched("a", "2026-03-01T10:00:00+00:00", 1, 1.0, 1.0),
            enriched("b", "2026-03-01T11:00:00+00:00", 999_999, 1.0, 0.0),
            enriched("c", "2026-03-01T12:00:00+00:00", 123_456, 0.0, 1.0),
        ];

        for day in aggregate(&plays) {
            assert!((0.0..=1.0).contains(&day.valence));
            assert!((0.0..=1.0).contains(&day.energy));
        }
    }

    #[test]
    fn total_minutes_sums_days() {
        let plays = vec![
            enriched("a", "2026-03-01T10:00:00+00:00", 60_000, 0.5, 0.5),
            enriched("b", "2026-03-02T10:00:00+00:00", 120_000, 0.5, 0.5),
        ];
        assert!((total_listening_minutes(&aggregate(&plays)) - 3.0).abs() < 1e-9);
    }
}
