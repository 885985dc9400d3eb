//! Risk bucketing, risk factors and retention recommendations

use crate::features::{CustomerFeatures, Feature};
use serde::{Deserialize, Serialize};

/// Number of risk factors reported per prediction
pub const MAX_REPORTED_FACTORS: usize = 3;

/// Churn risk bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    /// Bucket a churn probability in [0, 1]
    pub fn from_probability(probability: f64) -> Self {
        if probability < 0.3 {
            RiskCategory::Low
        } else if probability < 0.6 {
            RiskCategory::Medium
        } else {
            RiskCategory::High
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            RiskCategory::Low => "#10b981",
            RiskCategory::Medium => "#f59e0b",
            RiskCategory::High => "#ef4444",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskCategory::Low => "Low",
            RiskCategory::Medium => "Medium",
            RiskCategory::High => "High",
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A feature whose value crossed its risk threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    /// Display title, e.g. `Silence Index`
    pub feature: String,
    pub value: f64,
    /// Model importance in percent
    pub importance: f64,
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// All triggered risk factors, most important first.
///
/// `importances` is indexed like [`Feature::ALL`]; ties keep canonical order.
pub fn risk_factors(customer: &CustomerFeatures, importances: &[f64]) -> Vec<RiskFactor> {
    let mut factors: Vec<RiskFactor> = customer
        .iter()
        .filter(|(feature, value)| feature.indicates_risk(*value))
        .map(|(feature, value)| RiskFactor {
            feature: feature.title(),
            value: round2(value),
            importance: round2(importances.get(feature.index()).copied().unwrap_or(0.0) * 100.0),
        })
        .collect();

    factors.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    factors
}

/// Business recommendation for a risk bucket
pub fn recommendation(category: RiskCategory, factors: &[RiskFactor]) -> String {
    match category {
        RiskCategory::Low => {
            "Customer is engaged. Continue standard engagement practices.".to_string()
        }
        RiskCategory::Medium => {
            let actions: Vec<&str> = factors
                .iter()
                .take(2)
                .filter_map(|factor| action_for(&factor.feature))
                .collect();

            if actions.is_empty() {
                "Monitor engagement patterns closely".to_string()
            } else {
                actions.join(" | ")
            }
        }
        RiskCategory::High => "URGENT: Assign dedicated account manager | Offer retention incentive | Immediate human outreach required".to_string(),
    }
}

fn action_for(title: &str) -> Option<&'static str> {
    let mentions = |feature: Feature| title.contains(feature.title().as_str());

    if mentions(Feature::EngagementMomentum) {
        Some("Send personalized re-engagement campaign")
    } else if mentions(Feature::BehavioralDrift) {
        Some("Trigger feature discovery onboarding")
    } else if mentions(Feature::SilenceIndex) {
        Some("Schedule proactive check-in call")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(values: [f64; 6]) -> CustomerFeatures {
        CustomerFeatures::from_slice(&values).unwrap()
    }

    fn factor(feature: Feature, importance: f64) -> RiskFactor {
        RiskFactor {
            feature: feature.title(),
            value: 0.0,
            importance,
        }
    }

    #[test]
    fn test_category_boundaries() {
        assert_eq!(RiskCategory::from_probability(0.0), RiskCategory::Low);
        assert_eq!(RiskCategory::from_probability(0.2999), RiskCategory::Low);
        assert_eq!(RiskCategory::from_probability(0.3), RiskCategory::Medium);
        assert_eq!(RiskCategory::from_probability(0.5999), RiskCategory::Medium);
        assert_eq!(RiskCategory::from_probability(0.6), RiskCategory::High);
        assert_eq!(RiskCategory::High.color(), "#ef4444");
        assert_eq!(serde_json::to_string(&RiskCategory::Medium).unwrap(), "\"Medium\"");
    }

    #[test]
    fn test_risk_factors_sorted_by_importance() {
        // Every indicator fires
        let c = customer([-30.0, 50.0, 10.0, 150.0, 40.0, 20.0]);
        let importances = [0.10, 0.30, 0.05, 0.25, 0.20, 0.10];

        let factors = risk_factors(&c, &importances);
        let names: Vec<&str> = factors.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Behavioral Drift",
                "Response Degradation",
                "Session Decay Rate",
                "Engagement Momentum",
                "Consistency Score",
                "Silence Index",
            ]
        );
        assert_eq!(factors[0].importance, 30.0);
    }

    #[test]
    fn test_healthy_customer_has_no_factors() {
        let c = customer([5.0, 10.0, 1.0, 20.0, 5.0, 90.0]);
        assert!(risk_factors(&c, &[1.0 / 6.0; 6]).is_empty());
    }

    #[test]
    fn test_values_rounded() {
        let c = customer([-25.456, 0.0, 0.0, 0.0, 0.0, 100.0]);
        let factors = risk_factors(&c, &[0.123456, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].value, -25.46);
        assert_eq!(factors[0].importance, 12.35);
    }

    #[test]
    fn test_recommendations() {
        assert_eq!(
            recommendation(RiskCategory::Low, &[]),
            "Customer is engaged. Continue standard engagement practices."
        );
        assert!(recommendation(RiskCategory::High, &[]).starts_with("URGENT"));

        let factors = vec![
            factor(Feature::SilenceIndex, 30.0),
            factor(Feature::EngagementMomentum, 20.0),
            factor(Feature::BehavioralDrift, 10.0),
        ];
        assert_eq!(
            recommendation(RiskCategory::Medium, &factors),
            "Schedule proactive check-in call | Send personalized re-engagement campaign"
        );
    }

    #[test]
    fn test_medium_without_actionable_factors() {
        let factors = vec![
            factor(Feature::ConsistencyScore, 30.0),
            factor(Feature::SessionDecayRate, 20.0),
            factor(Feature::SilenceIndex, 10.0),
        ];
        assert_eq!(
            recommendation(RiskCategory::Medium, &factors),
            "Monitor engagement patterns closely"
        );
    }
}
