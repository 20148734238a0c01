use serde_json::{Value, json};

/// Fixed-size statistical summary of one side's per-move time spent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureSummary {
    pub mean: f64,
    pub std: f64,
    pub max: f64,
    pub min: f64,
    pub sum: f64,
}

impl FeatureSummary {
    pub const ZERO: Self = Self {
        mean: 0.0,
        std: 0.0,
        max: 0.0,
        min: 0.0,
        sum: 0.0,
    };

    pub fn to_array(self) -> [f64; 5] {
        [self.mean, self.std, self.max, self.min, self.sum]
    }

    pub fn to_json(self) -> Value {
        json!({
            "mean": self.mean,
            "std": self.std,
            "max": self.max,
            "min": self.min,
            "total": self.sum,
        })
    }
}

/// Mean, population standard deviation, max, min and sum of `spent`.
///
/// Empty input yields [`FeatureSummary::ZERO`]; a single value has a
/// standard deviation of exactly zero.
pub fn summarize(spent: &[i64]) -> FeatureSummary {
    let (Some(&max), Some(&min)) = (spent.iter().max(), spent.iter().min()) else {
        return FeatureSummary::ZERO;
    };

    let sum: i64 = spent.iter().sum();
    let n = spent.len() as f64;
    let mean = sum as f64 / n;

    let std = if spent.len() > 1 {
        let variance = spent
            .iter()
            .map(|&x| {
                let d = x as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        variance.sqrt()
    } else {
        0.0
    };

    FeatureSummary {
        mean,
        std,
        max: max as f64,
        min: min as f64,
        sum: sum as f64,
    }
}
