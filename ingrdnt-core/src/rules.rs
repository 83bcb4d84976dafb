//! Keyword rules for harmful / beneficial ingredients.
//!
//! Rules are an ordered, versioned list loaded from JSON. The built-in set is
//! compiled in from `data/rules.json`; deployments can point
//! `INGRDNT_RULES_PATH` at their own file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RulesError {
    #[error("Failed to read rules file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid rules JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rule {index} has an empty pattern")]
    EmptyPattern { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Harmful,
    Beneficial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Matched by substring containment against the token.
    pub pattern: String,
    pub classification: Classification,
    pub rationale: String,
}

/// Local classification of one token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    pub harmful: bool,
    pub beneficial: bool,
    /// Harmful rationale wins when both kinds of rule match.
    pub reason: Option<String>,
}

impl Verdict {
    pub fn is_neutral(&self) -> bool {
        !self.harmful && !self.beneficial
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub version: String,
    pub rules: Vec<Rule>,
}

static BUILTIN_RULES: LazyLock<RuleSet> = LazyLock::new(|| {
    let json = include_str!("../../data/rules.json");
    RuleSet::from_json(json).expect("Failed to parse built-in rules.json")
});

impl RuleSet {
    /// The rules shipped with the library.
    pub fn builtin() -> &'static RuleSet {
        &BUILTIN_RULES
    }

    /// Parse and validate a rule configuration. Patterns are lowercased.
    pub fn from_json(json: &str) -> Result<Self, RulesError> {
        let mut set: RuleSet = serde_json::from_str(json)?;
        for (index, rule) in set.rules.iter_mut().enumerate() {
            rule.pattern = rule.pattern.trim().to_lowercase();
            if rule.pattern.is_empty() {
                return Err(RulesError::EmptyPattern { index });
            }
        }
        Ok(set)
    }

    pub fn from_path(path: &Path) -> Result<Self, RulesError> {
        let json = std::fs::read_to_string(path)?;
        let set = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), version = %set.version, rules = set.rules.len(), "loaded rules");
        Ok(set)
    }

    /// Classify a normalized token.
    ///
    /// A token is harmful if it contains any harmful pattern and beneficial
    /// if it contains any beneficial pattern; both may hold. The reason is
    /// the first matching harmful rationale in list order, falling back to
    /// the first matching beneficial one.
    pub fn classify(&self, token: &str) -> Verdict {
        let mut harmful_reason = None;
        let mut beneficial_reason = None;

        for rule in &self.rules {
            if !token.contains(rule.pattern.as_str()) {
                continue;
            }
            let slot = match rule.classification {
                Classification::Harmful => &mut harmful_reason,
                Classification::Beneficial => &mut beneficial_reason,
            };
            if slot.is_none() {
                *slot = Some(rule.rationale.as_str());
            }
        }

        Verdict {
            harmful: harmful_reason.is_some(),
            beneficial: beneficial_reason.is_some(),
            reason: harmful_reason.or(beneficial_reason).map(str::to_string),
        }
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_loads() {
        let rules = RuleSet::builtin();
        assert!(!rules.version.is_empty());
        assert_eq!(rules.rules.len(), 17);
    }

    #[test]
    fn test_sodium_benzoate_and_vitamin_c() {
        let rules = RuleSet::builtin();

        let benzoate = rules.classify("sodium benzoate");
        assert!(benzoate.harmful);
        assert!(benzoate.reason.is_some());

        let vitamin = rules.classify("vitamin c");
        assert!(!vitamin.harmful);
        assert!(vitamin.beneficial);
        assert_eq!(vitamin.reason.as_deref(), Some("Known beneficial compound"));
    }

    #[test]
    fn test_substring_match_on_compound_names() {
        let verdict = RuleSet::builtin().classify("high fructose corn syrup");
        assert!(verdict.harmful);
    }

    #[test]
    fn test_neutral_has_no_reason() {
        let verdict = RuleSet::builtin().classify("water");
        assert!(verdict.is_neutral());
        assert_eq!(verdict.reason, None);
    }

    #[test]
    fn test_both_sets_harmful_reason_wins() {
        let verdict = RuleSet::builtin().classify("gluten protein");
        assert!(verdict.harmful);
        assert!(verdict.beneficial);
        assert_eq!(
            verdict.reason.as_deref(),
            Some("Gluten flagged by keyword pattern")
        );
    }

    #[test]
    fn test_first_matching_rule_in_order() {
        let rules = RuleSet::from_json(
            r#"{"version": "t", "rules": [
                {"pattern": "syrup", "classification": "harmful", "rationale": "first"},
                {"pattern": "corn syrup", "classification": "harmful", "rationale": "second"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(rules.classify("corn syrup").reason.as_deref(), Some("first"));
    }

    #[test]
    fn test_patterns_lowercased_and_validated() {
        let rules = RuleSet::from_json(
            r#"{"version": "t", "rules": [
                {"pattern": " MSG ", "classification": "harmful", "rationale": "r"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(rules.rules[0].pattern, "msg");

        let err = RuleSet::from_json(
            r#"{"version": "t", "rules": [
                {"pattern": "  ", "classification": "harmful", "rationale": "r"}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RulesError::EmptyPattern { index: 0 }));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"{"version": "v2", "rules": [
                {"pattern": "palm oil", "classification": "harmful", "rationale": "Palm oil"}
            ]}"#,
        )
        .unwrap();
        let rules = RuleSet::from_path(&path).unwrap();
        assert_eq!(rules.version, "v2");
        assert!(rules.classify("palm oil").harmful);
        assert!(!rules.classify("aspartame").harmful);
    }
}
