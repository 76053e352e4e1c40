use crate::models::{DailyMetric, PersonalBaseline};

/// Threshold width used in place of a zero standard deviation.
pub const MIN_EFFECTIVE_STD: f64 = 0.15;

// Uniform days can leave rounding residue instead of an exact zero.
const ZERO_STD_TOLERANCE: f64 = 1e-9;

impl Default for PersonalBaseline {
    fn default() -> Self {
        Self {
            avg_valence: 0.5,
            avg_energy: 0.5,
            std_valence: 0.1,
            std_energy: 0.1,
            avg_listening_time: 60.0,
            avg_diversity: 0.8,
        }
    }
}

impl PersonalBaseline {
    pub fn effective_std_valence(&self) -> f64 {
        effective_std(self.std_valence)
    }

    pub fn effective_std_energy(&self) -> f64 {
        effective_std(self.std_energy)
    }
}

fn effective_std(std: f64) -> f64 {
    if std.abs() < ZERO_STD_TOLERANCE {
        MIN_EFFECTIVE_STD
    } else {
        std
    }
}

pub fn baseline(metrics: &[DailyMetric]) -> PersonalBaseline {
    if metrics.is_empty() {
        return PersonalBaseline::default();
    }

    let avg_valence = mean(metrics.iter().map(|m| m.valence));
    let avg_energy = mean(metrics.iter().map(|m| m.energy));

    PersonalBaseline {
        avg_valence,
        avg_energy,
        std_valence: population_std(metrics.iter().map(|m| m.valence), avg_valence),
        std_energy: population_std(metrics.iter().map(|m| m.energy), avg_energy),
        avg_listening_time: mean(metrics.iter().map(|m| m.listening_time_minutes)),
        avg_diversity: mean(metrics.iter().map(|m| m.diversity)),
    }
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.sum::<f64>() / n as f64
}

fn population_std(values: impl ExactSizeIterator<Item = f64>, mean: f64) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    variance.sqrt()
}
