//! Keyword rule table.
//!
//! Each tier maps a set of lower-case phrases to a severity, an alert type and a
//! notification policy. The table is plain data: tiers and keywords can be
//! replaced from configuration without touching the classifier.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::models::{AlertType, Severity};

const CRITICAL_KEYWORDS: &[&str] = &[
    "danger",
    "hazard",
    "collision",
    "emergency",
    "fire",
    "smoke",
    "falling",
    "cliff",
    "edge",
    "vehicle approaching",
    "car coming",
    "life threat",
    "immediate danger",
    "toxic",
    "electric",
];

const HIGH_KEYWORDS: &[&str] = &[
    "obstacle ahead",
    "close",
    "very near",
    "blocked path",
    "stairs ahead",
    "uneven ground",
    "construction zone",
    "caution required",
    "watch out",
    "be careful",
    "step down",
    "curb ahead",
    "person approaching",
    "bicycle",
];

const MEDIUM_KEYWORDS: &[&str] = &[
    "door",
    "wall",
    "furniture",
    "slight obstacle",
    "narrow path",
    "crowded area",
    "noisy environment",
    "poor lighting",
];

/// One severity tier of the rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRule {
    pub tier: String,
    pub keywords: Vec<String>,
    pub severity: Severity,
    pub alert_type: AlertType,
    pub notify_by_email: bool,
}

impl AlertRule {
    fn from_static(
        tier: &str,
        keywords: &[&str],
        severity: Severity,
        alert_type: AlertType,
        notify_by_email: bool,
    ) -> Self {
        Self {
            tier: tier.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            severity,
            alert_type,
            notify_by_email,
        }
    }

    /// Trims and lower-cases keywords, dropping repeats (first occurrence wins).
    fn normalized(self) -> Result<Self, ConfigurationError> {
        let tier = self.tier.trim().to_string();
        if tier.is_empty() {
            return Err(ConfigurationError::BlankTierName);
        }
        if self.keywords.is_empty() {
            return Err(ConfigurationError::EmptyTier(tier));
        }

        let mut keywords: Vec<String> = Vec::with_capacity(self.keywords.len());
        for raw in &self.keywords {
            let keyword = shared::text::normalize_phrase(raw);
            if keyword.is_empty() {
                return Err(ConfigurationError::BlankKeyword(tier));
            }
            if !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }

        Ok(Self {
            tier,
            keywords,
            ..self
        })
    }
}

/// The three tiers shipped by default, in declaration order.
pub fn default_rules() -> Vec<AlertRule> {
    vec![
        AlertRule::from_static(
            "critical",
            CRITICAL_KEYWORDS,
            Severity::Critical,
            AlertType::LifeThreat,
            true,
        ),
        AlertRule::from_static(
            "high",
            HIGH_KEYWORDS,
            Severity::High,
            AlertType::CloseCall,
            true,
        ),
        AlertRule::from_static(
            "medium",
            MEDIUM_KEYWORDS,
            Severity::Medium,
            AlertType::Warning,
            false,
        ),
    ]
}

/// Validated, immutable rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<AlertRule>,
}

impl RuleTable {
    /// Builds a table, rejecting an empty table, keyword-less tiers and blank keywords.
    pub fn new(rules: Vec<AlertRule>) -> Result<Self, ConfigurationError> {
        if rules.is_empty() {
            return Err(ConfigurationError::EmptyRuleTable);
        }
        let rules = rules
            .into_iter()
            .map(AlertRule::normalized)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// The default critical/high/medium table.
    pub fn standard() -> Self {
        Self {
            rules: default_rules(),
        }
    }

    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, tier: &str) -> Option<&AlertRule> {
        self.rules.iter().find(|r| r.tier == tier)
    }
}
