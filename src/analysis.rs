use serde::Serialize;
use tracing::info;

use crate::baseline::baseline;
use crate::enrich::enrich;
use crate::metrics::aggregate;
use crate::models::{AudioFeatureSet, DailyMetric, EnrichedPlay, Insight, PersonalBaseline, PlayEvent};
use crate::patterns::detect;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    #[serde(skip)]
    pub enriched: Vec<EnrichedPlay>,
    pub metrics: Vec<DailyMetric>,
    pub baseline: PersonalBaseline,
    pub insights: Vec<Insight>,
}

pub fn analyze(plays: &[PlayEvent], features: &[AudioFeatureSet]) -> Analysis {
    let enriched = enrich(plays, features);
    let metrics = aggregate(&enriched);
    let baseline = baseline(&metrics);
    let insights = detect(&metrics, &enriched, &baseline);

    info!(
        plays = plays.len(),
        matched = enriched.len(),
        days = metrics.len(),
        insights = insights.len(),
        "analysis complete"
    );

    Analysis {
        enriched,
        metrics,
        baseline,
        insights,
    }
}
