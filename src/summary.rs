use std::collections::HashMap;

use crate::models::{EnrichedPlay, FeatureSummary, Insight, PersonalBaseline, Severity, TopTrack};

pub const NOMINAL_STATUS: &str = "All systems nominal";

pub fn feature_summary(enriched: &[EnrichedPlay]) -> FeatureSummary {
    if enriched.is_empty() {
        return FeatureSummary::default();
    }

    let n = enriched.len() as f64;
    let avg = |pick: fn(&EnrichedPlay) -> f64| enriched.iter().map(pick).sum::<f64>() / n;

    FeatureSummary {
        energy: avg(|e| e.features.energy),
        valence: avg(|e| e.features.valence),
        danceability: avg(|e| e.features.danceability),
        acousticness: avg(|e| e.features.acousticness),
        instrumentalness: avg(|e| e.features.instrumentalness),
        tempo: avg(|e| e.features.tempo),
    }
}

/// Most-played tracks, ties broken by first appearance in the history.
pub fn top_tracks(enriched: &[EnrichedPlay], limit: usize) -> Vec<TopTrack> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut tracks: Vec<TopTrack> = Vec::new();

    for item in enriched {
        let play = &item.play;
        match index.get(play.track_id.as_str()) {
            Some(&pos) => tracks[pos].play_count += 1,
            None => {
                index.insert(play.track_id.as_str(), tracks.len());
                tracks.push(TopTrack {
                    track_id: play.track_id.clone(),
                    name: play.track_name.clone(),
                    artist: play.artists.first().map(|a| a.name.clone()),
                    play_count: 1,
                });
            }
        }
    }

    // stable sort keeps first-appearance order among equal counts
    tracks.sort_by(|a, b| b.play_count.cmp(&a.play_count));
    tracks.truncate(limit);
    tracks
}

pub fn mood_description(baseline: &PersonalBaseline) -> String {
    let energy = if baseline.avg_energy > 0.6 {
        "High Energy"
    } else {
        "Calm"
    };
    let valence = if baseline.avg_valence > 0.5 {
        "Positive"
    } else {
        "Introspective"
    };
    format!("Your music tends to be {energy} and {valence}.")
}

pub fn status_line(insights: &[Insight]) -> &str {
    insights
        .iter()
        .find(|i| i.severity == Some(Severity::High))
        .map(|i| i.title.as_str())
        .unwrap_or(NOMINAL_STATUS)
}
