use tracing::debug;

use crate::models::{
    ActionParams, DailyMetric, EnrichedPlay, Insight, InsightType, PersonalBaseline, Severity,
};

const STREAK_WINDOW: usize = 5;
const STREAK_MIN_DAYS: usize = 4;
const VOLATILITY_WINDOW: usize = 3;
const VOLATILITY_SWING: f64 = 0.4;
const OVERSTIMULATION_TRACKS: usize = 10;
const OVERSTIMULATION_ENERGY: f64 = 0.85;

pub const BALANCED_TITLE: &str = "Balanced Foundation";

struct Snapshot<'a> {
    metrics: &'a [DailyMetric],
    recent: &'a DailyMetric,
    recent_plays: Vec<&'a EnrichedPlay>,
    baseline: &'a PersonalBaseline,
}

type Rule = fn(&Snapshot) -> Option<Insight>;

const RULES: [(&str, Rule); 6] = [
    ("streak", low_mood_streak),
    ("stress", stress_pattern),
    ("volatility", emotional_volatility),
    ("overstimulation", overstimulation),
    ("recovery", recovery),
    ("numbing", emotional_numbing),
];

/// Empty history yields no insights; otherwise a "Balanced Foundation" insight
/// stands in when no rule fires.
pub fn detect(
    metrics: &[DailyMetric],
    enriched: &[EnrichedPlay],
    baseline: &PersonalBaseline,
) -> Vec<Insight> {
    let Some(recent) = metrics.last() else {
        return Vec::new();
    };

    let mut recent_plays: Vec<&EnrichedPlay> = enriched.iter().collect();
    recent_plays.sort_by(|a, b| b.play.played_at.cmp(&a.play.played_at));

    let snapshot = Snapshot {
        metrics,
        recent,
        recent_plays,
        baseline,
    };

    let mut insights = Vec::new();
    for (name, rule) in RULES {
        if let Some(insight) = rule(&snapshot) {
            debug!(rule = name, date = %recent.date, "pattern rule fired");
            insights.push(insight);
        }
    }

    if insights.is_empty() {
        insights.push(balanced(baseline));
    }

    insights
}

fn low_mood_streak(s: &Snapshot) -> Option<Insight> {
    let tail = &s.metrics[s.metrics.len().saturating_sub(STREAK_WINDOW)..];
    let threshold = s.baseline.avg_valence - 0.5 * s.baseline.effective_std_valence();
    let low_days = tail.iter().filter(|m| m.valence < threshold).count();

    if low_days < STREAK_MIN_DAYS {
        return None;
    }

    Some(Insight {
        kind: InsightType::Streak,
        title: "Sustained Low Mood".to_string(),
        description: format!(
            "{low_days} of your last {} listening days sat below your usual valence. \
             This is a sustained shift away from your baseline rather than a single off day.",
            tail.len()
        ),
        severity: Some(Severity::Medium),
        action_label: Some("Low Energy Reset".to_string()),
        action_params: Some(ActionParams {
            target_valence: Some(s.baseline.avg_valence + 0.2),
            target_energy: Some(s.baseline.avg_energy - 0.1),
            target_acousticness: None,
        }),
    })
}

fn stress_pattern(s: &Snapshot) -> Option<Insight> {
    let recent = s.recent;
    let b = s.baseline;

    let tense = recent.energy > b.avg_energy + 0.5 * b.effective_std_energy()
        && recent.valence < b.avg_valence
        && recent.diversity < 0.8 * b.avg_diversity;
    let late_looping = recent.late_night_ratio > 0.4 && recent.diversity < 0.5;

    if !(tense || late_looping) {
        return None;
    }

    Some(Insight {
        kind: InsightType::Stress,
        title: "Stress Pattern Detected".to_string(),
        description: "High-energy, low-reward and highly repetitive listening, a combination \
                      often tied to regulating stress. Late-night looping can cut into recovery."
            .to_string(),
        severity: Some(Severity::High),
        action_label: Some("Calm Regulation Mix".to_string()),
        action_params: Some(ActionParams {
            target_valence: Some(0.6),
            target_energy: Some(0.2),
            target_acousticness: Some(0.7),
        }),
    })
}

fn emotional_volatility(s: &Snapshot) -> Option<Insight> {
    if s.metrics.len() < VOLATILITY_WINDOW {
        return None;
    }

    let last = &s.metrics[s.metrics.len() - VOLATILITY_WINDOW..];
    let swing = (last[2].valence - last[1].valence).abs() + (last[1].valence - last[0].valence).abs();
    if swing <= VOLATILITY_SWING {
        return None;
    }

    Some(Insight {
        kind: InsightType::Volatility,
        title: "Emotional Volatility".to_string(),
        description: format!(
            "Your mood signature swung by {swing:.2} in valence over the last three days. \
             Music is acting as an emotional pendulum right now."
        ),
        severity: None,
        action_label: Some("Grounding Playlist".to_string()),
        action_params: Some(ActionParams {
            target_valence: Some(s.baseline.avg_valence),
            target_energy: Some(0.3),
            target_acousticness: None,
        }),
    })
}

fn overstimulation(s: &Snapshot) -> Option<Insight> {
    let window: Vec<&EnrichedPlay> = s
        .recent_plays
        .iter()
        .take(OVERSTIMULATION_TRACKS)
        .copied()
        .collect();
    if window.is_empty() {
        return None;
    }

    // a short history counts as quiet listening for the missing slots
    let avg_energy =
        window.iter().map(|p| p.features.energy).sum::<f64>() / OVERSTIMULATION_TRACKS as f64;
    if avg_energy <= OVERSTIMULATION_ENERGY {
        return None;
    }

    Some(Insight {
        kind: InsightType::Overstimulation,
        title: "Overstimulation Alert".to_string(),
        description: format!(
            "Your last {} tracks averaged {avg_energy:.2} energy. Notice whether that intensity \
             is helping you focus or wearing you out.",
            window.len()
        ),
        severity: Some(Severity::Low),
        action_label: Some("Soft Acoustic Shift".to_string()),
        action_params: Some(ActionParams {
            target_valence: None,
            target_energy: Some(0.4),
            target_acousticness: Some(0.8),
        }),
    })
}

fn recovery(s: &Snapshot) -> Option<Insight> {
    if s.metrics.len() < 2 {
        return None;
    }

    let prev = &s.metrics[s.metrics.len() - 2];
    let b = s.baseline;
    let calmed = prev.energy > b.avg_energy
        && s.recent.energy < b.avg_energy
        && s.recent.valence >= b.avg_valence;
    if !calmed {
        return None;
    }

    Some(Insight {
        kind: InsightType::Recovery,
        title: "Calm Regulation".to_string(),
        description: "You moved from higher tension on your previous listening day to a \
                      calmer, more settled state on the latest one."
            .to_string(),
        severity: Some(Severity::Low),
        action_label: None,
        action_params: None,
    })
}

fn emotional_numbing(s: &Snapshot) -> Option<Insight> {
    let recent = s.recent;
    if recent.diversity >= 0.3 || (recent.valence - s.baseline.avg_valence).abs() >= 0.05 {
        return None;
    }

    Some(Insight {
        kind: InsightType::Numbing,
        title: "Emotional Numbing".to_string(),
        description: "Flat emotional tone combined with heavy repetition. This can point to \
                      detachment or listening on autopilot."
            .to_string(),
        severity: None,
        action_label: Some("Novelty Injection".to_string()),
        action_params: Some(ActionParams {
            target_valence: Some(0.7),
            target_energy: Some(0.6),
            target_acousticness: None,
        }),
    })
}

fn balanced(baseline: &PersonalBaseline) -> Insight {
    Insight {
        kind: InsightType::None,
        title: BALANCED_TITLE.to_string(),
        description: "Your listening is stable and close to your personal baseline. Music is \
                      working as a consistent anchor."
            .to_string(),
        severity: None,
        action_label: Some("Maintain Flow".to_string()),
        action_params: Some(ActionParams {
            target_valence: Some(baseline.avg_valence),
            target_energy: Some(baseline.avg_energy),
            target_acousticness: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{baseline, day, enriched};

    fn kinds(insights: &[Insight]) -> Vec<InsightType> {
        insights.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn empty_history_has_no_insights() {
        let insights = detect(&[], &[], &PersonalBaseline::default());
        assert!(insights.is_empty());
    }

    #[test]
    fn sustained_low_mood_fires_streak() {
        let metrics: Vec<DailyMetric> = (1..=5)
            .map(|d| day(&format!("2026-03-0{d}"), 0.1, 0.5))
            .collect();
        let reference = baseline(0.6, 0.5, 0.05, 0.8);

        let insights = detect(&metrics, &[], &reference);
        let streak = insights
            .iter()
            .find(|i| i.kind == InsightType::Streak)
            .expect("streak insight");
        assert_eq!(streak.severity, Some(Severity::Medium));
        let params = streak.action_params.expect("targets");
        assert!((params.target_valence.unwrap_or_default() - 0.8).abs() < 1e-9);
        assert!((params.target_energy.unwrap_or_default() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn streak_needs_four_low_days() {
        let metrics = vec![
            day("2026-03-01", 0.1, 0.5),
            day("2026-03-02", 0.1, 0.5),
            day("2026-03-03", 0.1, 0.5),
            day("2026-03-04", 0.6, 0.5),
            day("2026-03-05", 0.6, 0.5),
        ];
        let reference = baseline(0.6, 0.5, 0.05, 0.8);

        assert!(!kinds(&detect(&metrics, &[], &reference)).contains(&InsightType::Streak));
    }

    #[test]
    fn streak_skips_short_history() {
        let metrics = vec![day("2026-03-01", 0.1, 0.5), day("2026-03-02", 0.1, 0.5)];
        let reference = baseline(0.6, 0.5, 0.05, 0.8);

        assert!(!kinds(&detect(&metrics, &[], &reference)).contains(&InsightType::Streak));
    }

    #[test]
    fn high_arousal_low_reward_repetition_is_stress() {
        let mut recent = day("2026-03-01", 0.2, 0.9);
        recent.diversity = 0.2;
        let reference = baseline(0.5, 0.5, 0.1, 0.8);

        let insights = detect(&[recent], &[], &reference);
        let stress = insights
            .iter()
            .find(|i| i.kind == InsightType::Stress)
            .expect("stress insight");
        assert_eq!(stress.severity, Some(Severity::High));
        assert_eq!(
            stress.action_params,
            Some(ActionParams {
                target_valence: Some(0.6),
                target_energy: Some(0.2),
                target_acousticness: Some(0.7),
            })
        );
    }

    #[test]
    fn late_night_looping_is_stress() {
        let mut recent = day("2026-03-01", 0.5, 0.5);
        recent.late_night_ratio = 0.5;
        recent.diversity = 0.45;
        let reference = baseline(0.5, 0.5, 0.1, 0.8);

        assert!(kinds(&detect(&[recent], &[], &reference)).contains(&InsightType::Stress));
    }

    #[test]
    fn large_swings_are_volatility() {
        let metrics = vec![
            day("2026-03-01", 0.2, 0.5),
            day("2026-03-02", 0.5, 0.5),
            day("2026-03-03", 0.3, 0.5),
        ];
        let reference = baseline(0.35, 0.5, 0.1, 0.8);

        let insights = detect(&metrics, &[], &reference);
        let volatility = insights
            .iter()
            .find(|i| i.kind == InsightType::Volatility)
            .expect("volatility insight");
        assert_eq!(volatility.severity, None);
        assert_eq!(
            volatility.action_params.and_then(|p| p.target_valence),
            Some(0.35)
        );
    }

    #[test]
    fn volatility_needs_three_days() {
        let metrics = vec![day("2026-03-01", 0.0, 0.5), day("2026-03-02", 1.0, 0.5)];
        let reference = baseline(0.5, 0.5, 0.1, 0.8);

        assert!(!kinds(&detect(&metrics, &[], &reference)).contains(&InsightType::Volatility));
    }

    #[test]
    fn loud_recent_tracks_are_overstimulation() {
        let metrics = vec![day("2026-03-02", 0.5, 0.5)];
        let mut plays: Vec<EnrichedPlay> = (0..10)
            .map(|i| {
                enriched(
                    &format!("hot-{i}"),
                    &format!("2026-03-02T12:{:02}:00+00:00", i),
                    200_000,
                    0.5,
                    0.95,
                )
            })
            .collect();
        // older calm plays must fall outside the ten-track window
        plays.extend((0..10).map(|i| {
            enriched(
                &format!("calm-{i}"),
                &format!("2026-03-01T12:{:02}:00+00:00", i),
                200_000,
                0.5,
                0.1,
            )
        }));
        let reference = baseline(0.5, 0.5, 0.1, 0.8);

        let insights = detect(&metrics, &plays, &reference);
        let alert = insights
            .iter()
            .find(|i| i.kind == InsightType::Overstimulation)
            .expect("overstimulation insight");
        assert_eq!(alert.severity, Some(Severity::Low));
    }

    #[test]
    fn few_loud_plays_are_not_overstimulation() {
        let metrics = vec![day("2026-03-01", 0.5, 0.5)];
        let plays: Vec<EnrichedPlay> = (0..9)
            .map(|i| {
                enriched(
                    &format!("hot-{i}"),
                    &format!("2026-03-01T12:{:02}:00+00:00", i),
                    200_000,
                    0.5,
                    0.95,
                )
            })
            .collect();
        let reference = baseline(0.5, 0.5, 0.1, 0.8);

        // nine plays at 0.95 average 0.855 over the ten-track window
        assert!(kinds(&detect(&metrics, &plays, &reference)).contains(&InsightType::Overstimulation));
        assert!(!kinds(&detect(&metrics, &plays[..1], &reference))
            .contains(&InsightType::Overstimulation));
        assert!(!kinds(&detect(&metrics, &plays[..8], &reference))
            .contains(&InsightType::Overstimulation));
    }

    #[test]
    fn overstimulation_uses_most_recent_plays() {
        let metrics = vec![day("2026-03-02", 0.5, 0.5)];
        let mut plays: Vec<EnrichedPlay> = (0..10)
            .map(|i| {
                enriched(
                    &format!("old-{i}"),
                    &format!("2026-03-01T12:{:02}:00+00:00", i),
                    200_000,
                    0.5,
                    0.99,
                )
            })
            .collect();
        plays.extend((0..10).map(|i| {
            enriched(
                &format!("new-{i}"),
                &format!("2026-03-02T12:{:02}:00+00:00", i),
                200_000,
                0.5,
                0.2,
            )
        }));
        let reference = baseline(0.5, 0.5, 0.1, 0.8);

        let insights = detect(&metrics, &plays, &reference);
        assert!(!kinds(&insights).contains(&InsightType::Overstimulation));
    }

    #[test]
    fn calming_after_tension_is_recovery() {
        let metrics = vec![day("2026-03-01", 0.4, 0.8), day("2026-03-02", 0.55, 0.3)];
        let reference = baseline(0.5, 0.55, 0.1, 0.8);

        let insights = detect(&metrics, &[], &reference);
        let recovery = insights
            .iter()
            .find(|i| i.kind == InsightType::Recovery)
            .expect("recovery insight");
        assert_eq!(recovery.severity, Some(Severity::Low));
        assert!(recovery.action_params.is_none());
        assert!(recovery.action_label.is_none());
    }

    #[test]
    fn flat_repetitive_day_is_numbing() {
        let mut recent = day("2026-03-01", 0.52, 0.5);
        recent.diversity = 0.2;
        let reference = baseline(0.5, 0.5, 0.1, 0.8);

        let insights = detect(&[recent], &[], &reference);
        let numbing = insights
            .iter()
            .find(|i| i.kind == InsightType::Numbing)
            .expect("numbing insight");
        assert_eq!(numbing.severity, None);
    }

    #[test]
    fn quiet_day_falls_back_to_balanced() {
        let recent = day("2026-03-01", 0.5, 0.5);
        let reference = baseline(0.5, 0.5, 0.0, 0.8);
        let plays = vec![enriched("a", "2026-03-01T12:00:00+00:00", 200_000, 0.5, 0.5)];

        let insights = detect(&[recent], &plays, &reference);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightType::None);
        assert_eq!(insights[0].title, BALANCED_TITLE);
        assert_eq!(insights[0].severity, None);
        assert_eq!(
            insights[0].action_params,
            Some(ActionParams {
                target_valence: Some(0.5),
                target_energy: Some(0.5),
                target_acousticness: None,
            })
        );
    }

    #[test]
    fn rules_fire_together_in_order() {
        // four low days then a tense, repetitive one
        let mut metrics: Vec<DailyMetric> = (1..=4)
            .map(|d| day(&format!("2026-03-0{d}"), 0.1, 0.5))
            .collect();
        let mut last = day("2026-03-05", 0.1, 0.95);
        last.diversity = 0.1;
        metrics.push(last);
        let reference = baseline(0.6, 0.5, 0.05, 0.8);

        let insights = detect(&metrics, &[], &reference);
        assert_eq!(
            kinds(&insights),
            vec![InsightType::Streak, InsightType::Stress]
        );
    }
}
