//! Alert classifier.
//!
//! Applies the rule table to a model answer and produces exactly one
//! classification. When several tiers fire, the most severe one wins; tiers of
//! equal severity are resolved by declaration order.

use serde::Serialize;

use super::rules::{AlertRule, RuleTable};
use crate::models::{AlertType, Severity};

/// Result of classifying one response text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub detected: bool,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub matched_keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub notify_by_email: bool,
}

impl Classification {
    /// Classification for text that matched no tier.
    pub fn not_detected() -> Self {
        Self {
            detected: false,
            severity: Severity::Low,
            alert_type: AlertType::Info,
            matched_keywords: Vec::new(),
            confidence: None,
            notify_by_email: false,
        }
    }

    /// Whether this classification warrants a persisted alert.
    pub fn should_persist(&self) -> bool {
        self.detected && self.severity.is_actionable()
    }

    /// Whether recipients should be emailed about it.
    pub fn should_notify(&self) -> bool {
        self.should_persist() && self.notify_by_email
    }
}

/// `min(0.5 + matched/total * 0.5, 1.0)`.
pub fn keyword_confidence(matched: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.5;
    }
    (0.5 + (matched as f64 / total as f64) * 0.5).min(1.0)
}

/// Classifies a model answer against the rule table.
pub fn classify(text: &str, table: &RuleTable) -> Classification {
    let haystack = text.to_lowercase();

    let winner = table
        .rules()
        .iter()
        .filter_map(|rule| {
            let matched = matched_keywords(rule, &haystack);
            (!matched.is_empty()).then_some((rule, matched))
        })
        // min_by_key keeps the first of equal minima, so declaration order breaks ties
        .min_by_key(|(rule, _)| rule.severity.rank());

    match winner {
        None => Classification::not_detected(),
        Some((rule, matched)) => Classification {
            detected: true,
            severity: rule.severity,
            alert_type: rule.alert_type,
            confidence: Some(keyword_confidence(matched.len(), rule.keywords.len())),
            matched_keywords: matched,
            notify_by_email: rule.notify_by_email,
        },
    }
}

fn matched_keywords(rule: &AlertRule, haystack: &str) -> Vec<String> {
    rule.keywords
        .iter()
        .filter(|k| haystack.contains(k.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::rules::default_rules;

    fn table() -> RuleTable {
        RuleTable::standard()
    }

    #[test]
    fn test_text_without_keywords_is_not_detected() {
        let result = classify("A bright sunny morning in the park.", &table());
        assert_eq!(result, Classification::not_detected());
        assert!(!result.detected);
        assert_eq!(result.severity, Severity::Low);
        assert_eq!(result.alert_type, AlertType::Info);
        assert!(result.matched_keywords.is_empty());
        assert!(result.confidence.is_none());
        assert!(!result.notify_by_email);
    }

    #[test]
    fn test_empty_text_never_fires() {
        assert_eq!(classify("", &table()), Classification::not_detected());
    }

    #[test]
    fn test_danger_example() {
        let result = classify(
            "Danger! A car is 5 meters ahead, watch out for the curb.",
            &table(),
        );
        assert!(result.detected);
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.alert_type, AlertType::LifeThreat);
        assert!(result.matched_keywords.contains(&"danger".to_string()));
        assert!(result.notify_by_email);
        assert!(result.should_notify());
    }

    #[test]
    fn test_quiet_room_example() {
        let result = classify("You are in a quiet, open room with a table nearby.", &table());
        assert!(!result.detected);
        assert_eq!(result.severity, Severity::Low);
        assert!(!result.should_persist());
    }

    #[test]
    fn test_matching_is_case_insensitive_substring() {
        let result = classify("WATCH OUT, the FIREplace is lit", &table());
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.matched_keywords, vec!["fire"]);
    }

    #[test]
    fn test_partial_word_matches_count() {
        // "closet" contains "close"
        let result = classify("There is a closet on your left.", &table());
        assert_eq!(result.severity, Severity::High);
        assert_eq!(result.matched_keywords, vec!["close"]);
    }

    #[test]
    fn test_critical_dominates_match_counts() {
        let text = "Smoke. Also a door, a wall, furniture, a narrow path, a crowded area, \
                    poor lighting, be careful, watch out, step down.";
        let result = classify(text, &table());
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.matched_keywords, vec!["smoke"]);
    }

    #[test]
    fn test_medium_tier_does_not_notify() {
        let result = classify("There is a door to your right.", &table());
        assert!(result.detected);
        assert_eq!(result.severity, Severity::Medium);
        assert_eq!(result.alert_type, AlertType::Warning);
        assert!(result.should_persist());
        assert!(!result.should_notify());
    }

    #[test]
    fn test_matched_keywords_follow_table_order() {
        let result = classify("smoke then fire then danger", &table());
        assert_eq!(result.matched_keywords, vec!["danger", "fire", "smoke"]);
    }

    #[test]
    fn test_confidence_formula() {
        assert_eq!(keyword_confidence(0, 10), 0.5);
        assert_eq!(keyword_confidence(5, 10), 0.75);
        assert_eq!(keyword_confidence(10, 10), 1.0);
        assert_eq!(keyword_confidence(12, 10), 1.0);

        let result = classify("There is a door and a wall.", &table());
        assert_eq!(result.confidence, Some(0.5 + (2.0 / 8.0) * 0.5));
    }

    #[test]
    fn test_confidence_is_monotonic_and_bounded() {
        let binding = table();
        let keywords = &binding.rules()[0].keywords;
        let mut previous = 0.0;
        for n in 1..=keywords.len() {
            let text = keywords[..n].join(" ");
            let confidence = classify(&text, &table()).confidence.unwrap();
            assert!((0.5..=1.0).contains(&confidence));
            assert!(confidence >= previous);
            previous = confidence;
        }
        assert_eq!(previous, 1.0);
    }

    #[test]
    fn test_equal_severity_tie_goes_to_first_declared_tier() {
        let mut rules = default_rules();
        rules.insert(
            0,
            AlertRule {
                tier: "trip-hazard".to_string(),
                keywords: vec!["loose cable".to_string()],
                severity: Severity::High,
                alert_type: AlertType::Obstacle,
                notify_by_email: false,
            },
        );
        let custom = RuleTable::new(rules).unwrap();

        let result = classify("Be careful, a loose cable crosses the floor.", &custom);
        assert_eq!(result.severity, Severity::High);
        assert_eq!(result.alert_type, AlertType::Obstacle);
        assert_eq!(result.matched_keywords, vec!["loose cable"]);

        // Severity rank still beats declaration order.
        let result = classify("Loose cable near the fire.", &custom);
        assert_eq!(result.alert_type, AlertType::LifeThreat);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let text = "Watch out, stairs ahead and a bicycle close by.";
        assert_eq!(classify(text, &table()), classify(text, &table()));
    }

    #[test]
    fn test_classification_serialization() {
        let result = classify("danger", &table());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "life-threat");
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["matchedKeywords"][0], "danger");

        let none = serde_json::to_value(Classification::not_detected()).unwrap();
        assert!(none.get("confidence").is_none());
    }
}
