//! Maps external history and audio-feature payloads onto typed records.
//!
//! JSON follows the shape of a streaming service's recently-played and
//! audio-features responses; CSV is a flat export of the same fields.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::models::{Artist, AudioFeatureSet, PlayEvent};

/// Duration assumed when the feed omits one.
pub const DEFAULT_DURATION_MS: u64 = 180_000;

#[derive(Debug, Deserialize)]
struct RawArtist {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    artists: Vec<RawArtist>,
    #[serde(default)]
    duration_ms: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawPlayItem {
    #[serde(default)]
    track: Option<RawTrack>,
    #[serde(default)]
    played_at: Option<String>,
}

// Entries stay untyped until each one is decoded on its own, so a single
// malformed item cannot reject the whole document.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PlaysDocument {
    Page { items: Vec<Value> },
    Items(Vec<Value>),
}

#[derive(Debug, Deserialize)]
struct RawFeatures {
    #[serde(alias = "track_id")]
    id: Option<String>,
    valence: Option<f64>,
    energy: Option<f64>,
    danceability: Option<f64>,
    acousticness: Option<f64>,
    instrumentalness: Option<f64>,
    speechiness: Option<f64>,
    loudness: Option<f64>,
    tempo: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeaturesDocument {
    Page { audio_features: Vec<Value> },
    Items(Vec<Value>),
}

#[derive(Debug, Deserialize)]
struct CsvPlayRow {
    track_id: String,
    #[serde(default)]
    track_name: String,
    #[serde(default)]
    artists: String,
    #[serde(default)]
    played_at: Option<String>,
    duration_ms: Option<f64>,
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

pub fn load_plays(path: &Path, offset: Option<FixedOffset>) -> anyhow::Result<Vec<PlayEvent>> {
    let items = if is_csv(path) {
        read_csv_plays(path)?
    } else {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        parse_plays_json(&text).with_context(|| format!("invalid play history in {}", path.display()))?
    };

    let total = items.len();
    let plays: Vec<PlayEvent> = items
        .into_iter()
        .filter_map(|item| item.and_then(|item| to_play_event(item, offset)))
        .collect();

    info!(
        path = %path.display(),
        loaded = plays.len(),
        skipped = total - plays.len(),
        "loaded play history"
    );
    Ok(plays)
}

pub fn load_features(path: &Path) -> anyhow::Result<Vec<AudioFeatureSet>> {
    let raw = if is_csv(path) {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let mut rows = Vec::new();
        for (line, result) in reader.deserialize::<RawFeatures>().enumerate() {
            match result {
                Ok(row) => rows.push(Some(row)),
                Err(e) => {
                    warn!(path = %path.display(), row = line + 1, error = %e, "skipping bad feature row");
                    rows.push(None);
                }
            }
        }
        rows
    } else {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        parse_features_json(&text)
            .with_context(|| format!("invalid audio features in {}", path.display()))?
    };

    let total = raw.len();
    let features: Vec<AudioFeatureSet> = raw
        .into_iter()
        .filter_map(|entry| entry.and_then(to_feature_set))
        .collect();

    info!(
        path = %path.display(),
        loaded = features.len(),
        skipped = total - features.len(),
        "loaded audio features"
    );
    Ok(features)
}

fn decode_entries<T: DeserializeOwned>(entries: Vec<Value>, kind: &str) -> Vec<Option<T>> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            if entry.is_null() {
                return None;
            }
            match serde_json::from_value(entry) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    warn!(index, error = %e, "skipping malformed {kind} entry");
                    None
                }
            }
        })
        .collect()
}

fn parse_plays_json(text: &str) -> anyhow::Result<Vec<Option<RawPlayItem>>> {
    let document: PlaysDocument = serde_json::from_str(text)?;
    let entries = match document {
        PlaysDocument::Page { items } | PlaysDocument::Items(items) => items,
    };
    Ok(decode_entries(entries, "play"))
}

fn parse_features_json(text: &str) -> anyhow::Result<Vec<Option<RawFeatures>>> {
    let document: FeaturesDocument = serde_json::from_str(text)?;
    let entries = match document {
        FeaturesDocument::Page { audio_features } | FeaturesDocument::Items(audio_features) => {
            audio_features
        }
    };
    Ok(decode_entries(entries, "audio feature"))
}

fn read_csv_plays(path: &Path) -> anyhow::Result<Vec<Option<RawPlayItem>>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut items = Vec::new();

    for (line, result) in reader.deserialize::<CsvPlayRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!(path = %path.display(), row = line + 1, error = %e, "skipping bad play row");
                items.push(None);
                continue;
            }
        };
        let artists = row
            .artists
            .split(';')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| RawArtist {
                id: None,
                name: Some(name.to_string()),
            })
            .collect();

        items.push(Some(RawPlayItem {
            track: Some(RawTrack {
                id: Some(row.track_id),
                name: Some(row.track_name),
                artists,
                duration_ms: row.duration_ms,
            }),
            played_at: row.played_at,
        }));
    }

    Ok(items)
}

fn to_play_event(item: RawPlayItem, offset: Option<FixedOffset>) -> Option<PlayEvent> {
    let track = item.track?;
    let track_id = track.id.filter(|id| !id.trim().is_empty())?;

    let Some(raw_played_at) = item.played_at else {
        warn!(track_id = %track_id, "skipping play without a timestamp");
        return None;
    };
    let played_at = match DateTime::parse_from_rfc3339(raw_played_at.trim()) {
        Ok(ts) => ts,
        Err(e) => {
            warn!(track_id = %track_id, played_at = %raw_played_at, error = %e, "skipping play with bad timestamp");
            return None;
        }
    };
    let played_at = match offset {
        Some(tz) => played_at.with_timezone(&tz),
        None => played_at,
    };

    // float-to-int `as` saturates, so huge values clamp to u64::MAX
    let duration_ms = match track.duration_ms {
        Some(ms) if ms.is_finite() => ms.max(0.0).round() as u64,
        _ => DEFAULT_DURATION_MS,
    };

    let artists = track
        .artists
        .into_iter()
        .map(|a| {
            let name = a.name.unwrap_or_default();
            Artist {
                id: a.id.unwrap_or_else(|| name.clone()),
                name,
            }
        })
        .collect();

    Some(PlayEvent {
        track_id,
        track_name: track.name.unwrap_or_default(),
        artists,
        played_at,
        duration_ms,
    })
}

fn unit(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

fn to_feature_set(raw: RawFeatures) -> Option<AudioFeatureSet> {
    let track_id = raw.id.filter(|id| !id.trim().is_empty())?;

    let (valence, energy) = match (raw.valence, raw.energy) {
        (Some(v), Some(e)) if v.is_finite() && e.is_finite() => (v, e),
        _ => {
            warn!(track_id = %track_id, "dropping audio features without valence/energy");
            return None;
        }
    };

    Some(AudioFeatureSet {
        track_id,
        valence: valence.clamp(0.0, 1.0),
        energy: energy.clamp(0.0, 1.0),
        danceability: unit(raw.danceability),
        acousticness: unit(raw.acousticness),
        instrumentalness: unit(raw.instrumentalness),
        speechiness: unit(raw.speechiness),
        loudness: raw.loudness.filter(|l| l.is_finite()).unwrap_or(0.0),
        tempo: raw.tempo.filter(|t| t.is_finite()).map_or(0.0, |t| t.max(0.0)),
    })
}

pub fn parse_offset(value: &str) -> anyhow::Result<FixedOffset> {
    value
        .trim()
        .parse::<FixedOffset>()
        .with_context(|| format!("invalid UTC offset {value:?}, expected e.g. +02:00"))
}
