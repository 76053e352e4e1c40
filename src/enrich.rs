use std::collections::HashMap;

use tracing::debug;

use crate::models::{AudioFeatureSet, EnrichedPlay, PlayEvent};

/// Joins play events to their audio features by track id.
///
/// Plays without a matching feature set are dropped; podcasts and local files
/// routinely have none. Output keeps the order of `plays`. When a track id
/// appears more than once in `features`, the last entry wins.
pub fn enrich(plays: &[PlayEvent], features: &[AudioFeatureSet]) -> Vec<EnrichedPlay> {
    let lookup: HashMap<&str, &AudioFeatureSet> = features
        .iter()
        .map(|set| (set.track_id.as_str(), set))
        .collect();

    let enriched: Vec<EnrichedPlay> = plays
        .iter()
        .filter_map(|play| {
            lookup.get(play.track_id.as_str()).map(|set| EnrichedPlay {
                play: play.clone(),
                features: (*set).clone(),
            })
        })
        .collect();

    debug!(
        plays = plays.len(),
        enriched = enriched.len(),
        dropped = plays.len() - enriched.len(),
        "enriched listening history"
    );

    enriched
}
