use std::fmt::Write;

use crate::analysis::Analysis;
use crate::metrics::total_listening_minutes;
use crate::summary;

pub fn build_report(label: Option<&str>, analysis: &Analysis) -> String {
    let mut output = String::new();
    let label = label.unwrap_or("your listening history");

    let _ = writeln!(output, "# Listening Mood Report");
    match (analysis.metrics.first(), analysis.metrics.last()) {
        (Some(first), Some(last)) => {
            let _ = writeln!(
                output,
                "Generated for {} ({} to {}, {} days)",
                label,
                first.date,
                last.date,
                analysis.metrics.len()
            );
        }
        _ => {
            let _ = writeln!(output, "Generated for {label}");
        }
    }
    let _ = writeln!(output);

    let baseline = &analysis.baseline;
    let _ = writeln!(output, "## Baseline");
    let _ = writeln!(output, "{}", summary::mood_description(baseline));
    let _ = writeln!(
        output,
        "- Valence: {:.2} (std {:.2})",
        baseline.avg_valence, baseline.std_valence
    );
    let _ = writeln!(
        output,
        "- Energy: {:.2} (std {:.2})",
        baseline.avg_energy, baseline.std_energy
    );
    let _ = writeln!(
        output,
        "- Average listening: {:.0} min/day",
        baseline.avg_listening_time
    );
    let _ = writeln!(output, "- Diversity: {:.0}%", baseline.avg_diversity * 100.0);
    let _ = writeln!(
        output,
        "- Total listening: {:.0} min",
        total_listening_minutes(&analysis.metrics)
    );
    let _ = writeln!(output, "- Status: {}", summary::status_line(&analysis.insights));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Metrics");

    if analysis.metrics.is_empty() {
        let _ = writeln!(output, "No plays with audio features in this history.");
    } else {
        let _ = writeln!(
            output,
            "| Date | Plays | Minutes | Valence | Energy | Diversity | Late night |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|");
        for day in analysis.metrics.iter() {
            let _ = writeln!(
                output,
                "| {} | {} | {:.1} | {:.2} | {:.2} | {:.2} | {:.0}% |",
                day.date,
                day.count,
                day.listening_time_minutes,
                day.valence,
                day.energy,
                day.diversity,
                day.late_night_ratio * 100.0
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Insights");

    if analysis.insights.is_empty() {
        let _ = writeln!(output, "Not enough history to look for patterns yet.");
    } else {
        for insight in analysis.insights.iter() {
            match insight.severity {
                Some(severity) => {
                    let _ = writeln!(output, "### {} ({}, {})", insight.title, insight.kind, severity);
                }
                None => {
                    let _ = writeln!(output, "### {} ({})", insight.title, insight.kind);
                }
            }
            let _ = writeln!(output, "{}", insight.description);
            if let Some(label) = &insight.action_label {
                let _ = writeln!(output, "Suggested: {label}");
            }
            let _ = writeln!(output);
        }
    }

    let mut recent = analysis.enriched.iter().collect::<Vec<_>>();
    recent.sort_by(|a, b| b.play.played_at.cmp(&a.play.played_at));
    let _ = writeln!(output, "## Recent Plays");

    if recent.is_empty() {
        let _ = writeln!(output, "No plays recorded.");
    } else {
        for item in recent.iter().take(5) {
            let artist = item
                .play
                .artists
                .first()
                .map(|a| a.name.as_str())
                .unwrap_or("unknown artist");
            let _ = writeln!(
                output,
                "- {} by {} at {} (valence {:.2}, energy {:.2})",
                item.play.track_name,
                artist,
                item.play.played_at.format("%Y-%m-%d %H:%M"),
                item.features.valence,
                item.features.energy
            );
        }
    }

    output
}
