//! Builders shared by the unit tests.

use chrono::{DateTime, NaiveDate};

use crate::models::{Artist, AudioFeatureSet, DailyMetric, EnrichedPlay, PersonalBaseline, PlayEvent};

pub fn play(track_id: &str, played_at: &str, duration_ms: u64) -> PlayEvent {
    PlayEvent {
        track_id: track_id.to_string(),
        track_name: format!("Track {track_id}"),
        artists: vec![Artist {
            id: format!("artist-{track_id}"),
            name: format!("Artist {track_id}"),
        }],
        played_at: DateTime::parse_from_rfc3339(played_at).expect("valid test timestamp"),
        duration_ms,
    }
}

pub fn features(track_id: &str, valence: f64, energy: f64) -> AudioFeatureSet {
    AudioFeatureSet {
        track_id: track_id.to_string(),
        valence,
        energy,
        danceability: 0.5,
        acousticness: 0.3,
        instrumentalness: 0.1,
        speechiness: 0.05,
        loudness: -7.0,
        tempo: 120.0,
    }
}

pub fn enriched(
    track_id: &str,
    played_at: &str,
    duration_ms: u64,
    valence: f64,
    energy: f64,
) -> EnrichedPlay {
    EnrichedPlay {
        play: play(track_id, played_at, duration_ms),
        features: features(track_id, valence, energy),
    }
}

pub fn day(date: &str, valence: f64, energy: f64) -> DailyMetric {
    DailyMetric {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("valid test date"),
        valence,
        energy,
        count: 10,
        listening_time_minutes: 40.0,
        diversity: 0.8,
        late_night_ratio: 0.0,
    }
}

pub fn baseline(avg_valence: f64, avg_energy: f64, std: f64, avg_diversity: f64) -> PersonalBaseline {
    PersonalBaseline {
        avg_valence,
        avg_energy,
        std_valence: std,
        std_energy: std,
        avg_listening_time: 40.0,
        avg_diversity,
    }
}
