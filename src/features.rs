//! Behavioral features describing a customer's disengagement
//!
//! Every model input, risk indicator, and CSV column is keyed by one of the
//! six [`Feature`]s, always in the canonical order of [`Feature::ALL`].

use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};

/// Number of behavioral features the model consumes
pub const FEATURE_COUNT: usize = 6;

/// A behavioral disengagement signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Trend of recent activity relative to the customer's baseline (%)
    EngagementMomentum,
    /// How far feature usage has moved away from historical habits (%)
    BehavioralDrift,
    /// Days since the last meaningful interaction
    SilenceIndex,
    /// Slowdown in replies to outreach (%)
    ResponseDegradation,
    /// Rate at which session length is shrinking (%)
    SessionDecayRate,
    /// Regularity of usage, 0-100
    ConsistencyScore,
}

impl Feature {
    /// All features in canonical column order
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::EngagementMomentum,
        Feature::BehavioralDrift,
        Feature::SilenceIndex,
        Feature::ResponseDegradation,
        Feature::SessionDecayRate,
        Feature::ConsistencyScore,
    ];

    /// Column / JSON field name
    pub fn name(self) -> &'static str {
        match self {
            Feature::EngagementMomentum => "engagement_momentum",
            Feature::BehavioralDrift => "behavioral_drift",
            Feature::SilenceIndex => "silence_index",
            Feature::ResponseDegradation => "response_degradation",
            Feature::SessionDecayRate => "session_decay_rate",
            Feature::ConsistencyScore => "consistency_score",
        }
    }

    /// Human readable title, e.g. `Silence Index`
    pub fn title(self) -> String {
        self.name()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether `value` crosses this feature's risk threshold
    pub fn indicates_risk(self, value: f64) -> bool {
        match self {
            Feature::EngagementMomentum => value < -20.0,
            Feature::BehavioralDrift => value > 40.0,
            Feature::SilenceIndex => value > 8.0,
            Feature::ResponseDegradation => value > 100.0,
            Feature::SessionDecayRate => value > 30.0,
            Feature::ConsistencyScore => value < 50.0,
        }
    }

    /// Position in the feature matrix
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&f| f == self).unwrap_or_default()
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Feature column names in canonical order
pub fn feature_names() -> Vec<String> {
    Feature::ALL.iter().map(|f| f.name().to_string()).collect()
}

/// One customer's feature values, as posted by the prediction form
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CustomerFeatures {
    pub engagement_momentum: f64,
    pub behavioral_drift: f64,
    pub silence_index: f64,
    pub response_degradation: f64,
    pub session_decay_rate: f64,
    pub consistency_score: f64,
}

impl CustomerFeatures {
    /// Build from values in canonical order
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        if values.len() != FEATURE_COUNT {
            return Err(ChurnError::ShapeError {
                expected: format!("{} feature values", FEATURE_COUNT),
                actual: format!("{} feature values", values.len()),
            });
        }

        Ok(Self {
            engagement_momentum: values[0],
            behavioral_drift: values[1],
            silence_index: values[2],
            response_degradation: values[3],
            session_decay_rate: values[4],
            consistency_score: values[5],
        })
    }

    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::EngagementMomentum => self.engagement_momentum,
            Feature::BehavioralDrift => self.behavioral_drift,
            Feature::SilenceIndex => self.silence_index,
            Feature::ResponseDegradation => self.response_degradation,
            Feature::SessionDecayRate => self.session_decay_rate,
            Feature::ConsistencyScore => self.consistency_score,
        }
    }

    /// (feature, value) pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.iter().map(move |&f| (f, self.get(f)))
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().map(|(_, v)| v).collect()
    }

    /// Reject NaN and infinite values
    pub fn validate(&self) -> Result<()> {
        for (feature, value) in self.iter() {
            if !value.is_finite() {
                return Err(ChurnError::InvalidInput(format!(
                    "{} must be a finite number, got {}",
                    feature, value
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles() {
        assert_eq!(Feature::SilenceIndex.title(), "Silence Index");
        assert_eq!(Feature::EngagementMomentum.title(), "Engagement Momentum");
        assert_eq!(Feature::SessionDecayRate.title(), "Session Decay Rate");
    }

    #[test]
    fn test_risk_thresholds_are_strict() {
        assert!(!Feature::EngagementMomentum.indicates_risk(-20.0));
        assert!(Feature::EngagementMomentum.indicates_risk(-20.5));
        assert!(!Feature::SilenceIndex.indicates_risk(8.0));
        assert!(Feature::SilenceIndex.indicates_risk(8.1));
        assert!(Feature::ConsistencyScore.indicates_risk(49.9));
        assert!(!Feature::ResponseDegradation.indicates_risk(100.0));
    }

    #[test]
    fn test_canonical_order() {
        let customer = CustomerFeatures::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(customer.to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(customer.get(Feature::ResponseDegradation), 4.0);
        assert_eq!(Feature::ConsistencyScore.index(), 5);
        assert_eq!(feature_names()[1], "behavioral_drift");
    }

    #[test]
    fn test_deserialize_form_body() {
        let body = r#"{
            "engagement_momentum": -35.5,
            "behavioral_drift": 55,
            "silence_index": 12,
            "response_degradation": 140,
            "session_decay_rate": 42,
            "consistency_score": 30
        }"#;
        let customer: CustomerFeatures = serde_json::from_str(body).unwrap();
        assert_eq!(customer.engagement_momentum, -35.5);
        assert_eq!(customer.behavioral_drift, 55.0);
    }

    #[test]
    fn test_missing_field_rejected() {
        let body = r#"{"engagement_momentum": 1.0}"#;
        assert!(serde_json::from_str::<CustomerFeatures>(body).is_err());
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut customer = CustomerFeatures::from_slice(&[0.0; 6]).unwrap();
        assert!(customer.validate().is_ok());
        customer.silence_index = f64::NAN;
        assert!(matches!(customer.validate(), Err(ChurnError::InvalidInput(_))));
    }
}
