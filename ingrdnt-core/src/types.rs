use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::catalog::ProductRecord;
use crate::rules::Verdict;

/// A canonical lowercase ingredient name produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IngredientToken(String);

impl IngredientToken {
    /// Wrap an already-normalized name. Callers outside the normalizer are
    /// expected to pass lowercase, trimmed text.
    pub(crate) fn new(name: String) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for IngredientToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IngredientToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Vegan / vegetarian status as reported by the metadata service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietaryStatus {
    Yes,
    No,
    #[default]
    Unknown,
}

impl DietaryStatus {
    /// Map a service value. Only explicit "yes"/"no" are trusted; "maybe",
    /// absent or unexpected values are unknown.
    pub fn from_service(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("yes") => DietaryStatus::Yes,
            Some("no") => DietaryStatus::No,
            _ => DietaryStatus::Unknown,
        }
    }
}

/// Externally sourced per-ingredient facts.
///
/// `Default` is the "empty" metadata used when a lookup fails.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IngredientMetadata {
    pub nova: Option<u8>,
    pub vegan: DietaryStatus,
    pub vegetarian: DietaryStatus,
    pub additives: BTreeSet<String>,
    pub allergens: BTreeSet<String>,
}

impl IngredientMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One analyzed ingredient: rule verdict merged with metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientRecord {
    pub name: IngredientToken,
    pub harmful: bool,
    pub beneficial: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub nova: Option<u8>,
    pub vegan: DietaryStatus,
    pub vegetarian: DietaryStatus,
    pub additives: BTreeSet<String>,
    pub allergens: BTreeSet<String>,
}

impl IngredientRecord {
    pub fn merge(name: IngredientToken, verdict: Verdict, metadata: IngredientMetadata) -> Self {
        Self {
            name,
            harmful: verdict.harmful,
            beneficial: verdict.beneficial,
            reason: verdict.reason,
            nova: metadata.nova,
            vegan: metadata.vegan,
            vegetarian: metadata.vegetarian,
            additives: metadata.additives,
            allergens: metadata.allergens,
        }
    }
}

/// A suggested alternative product, by display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlternativeSuggestion {
    pub name: String,
}

impl AlternativeSuggestion {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for AlternativeSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Outcome of one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub product: ProductRecord,
    /// One record per distinct ingredient, in first-seen order.
    pub flagged: Vec<IngredientRecord>,
    /// At most five unique names, most popular first.
    pub alternatives: Vec<AlternativeSuggestion>,
}

impl ScanResult {
    /// Records flagged harmful by the rules.
    pub fn harmful(&self) -> impl Iterator<Item = &IngredientRecord> {
        self.flagged.iter().filter(|r| r.harmful)
    }
}
