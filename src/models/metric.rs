// Metric values arrive as JSON numbers or as numeric strings depending on the node build.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMetric {
    Number(f64),
    Text(String),
}

/// Parse a metric string. Unparseable or non-finite input becomes 0 and is logged.
pub fn parse_metric(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        Ok(v) => {
            tracing::warn!(value = %v, "non-finite metric, using 0");
            0.0
        }
        Err(e) => {
            tracing::warn!(value = %trimmed, error = %e, "unparseable metric, using 0");
            0.0
        }
    }
}

/// serde `deserialize_with` helper: accepts a number, a numeric string, or null.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawMetric>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawMetric::Number(v)) => v,
        Some(RawMetric::Text(s)) => parse_metric(&s),
        None => 0.0,
    })
}
