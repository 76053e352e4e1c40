use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

/// One listening occurrence from the history feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayEvent {
    pub track_id: String,
    pub track_name: String,
    pub artists: Vec<Artist>,
    pub played_at: DateTime<FixedOffset>,
    pub duration_ms: u64,
}

/// Per-track sonic descriptor. All fields are 0-1 except `loudness` (dB) and `tempo` (BPM).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatureSet {
    pub track_id: String,
    pub valence: f64,
    pub energy: f64,
    pub danceability: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub speechiness: f64,
    pub loudness: f64,
    pub tempo: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedPlay {
    pub play: PlayEvent,
    pub features: AudioFeatureSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMetric {
    pub date: NaiveDate,
    pub valence: f64,
    pub energy: f64,
    pub count: usize,
    pub listening_time_minutes: f64,
    pub diversity: f64,
    pub late_night_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalBaseline {
    pub avg_valence: f64,
    pub avg_energy: f64,
    pub std_valence: f64,
    pub std_energy: f64,
    pub avg_listening_time: f64,
    pub avg_diversity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Streak,
    Stress,
    Burnout,
    Volatility,
    Overstimulation,
    Recovery,
    Numbing,
    None,
}

impl std::fmt::Display for InsightType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            InsightType::Streak => "streak",
            InsightType::Stress => "stress",
            InsightType::Burnout => "burnout",
            InsightType::Volatility => "volatility",
            InsightType::Overstimulation => "overstimulation",
            InsightType::Recovery => "recovery",
            InsightType::Numbing => "numbing",
            InsightType::None => "none",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => f.write_str("low"),
            Severity::Medium => f.write_str("medium"),
            Severity::High => f.write_str("high"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_valence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_acousticness: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightType,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_params: Option<ActionParams>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FeatureSummary {
    pub energy: f64,
    pub valence: f64,
    pub danceability: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub tempo: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopTrack {
    pub track_id: String,
    pub name: String,
    pub artist: Option<String>,
    pub play_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub persona: String,
    pub description: String,
    pub hex_color: String,
}
