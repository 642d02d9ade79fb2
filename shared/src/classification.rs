//! Movement line classification
//!
//! Maps a movement line to exactly one category key of a [`Taxonomy`].
//! Priority order, first match wins:
//! 1. a known context tag, refined by mode or reason keywords
//! 2. return detection from kind, mode and reason
//! 3. a kind-based fallback, so every line classifies

use serde::{Deserialize, Serialize};

use crate::models::{Movement, MovementKind, MovementMode};
use crate::taxonomy::{ContextRule, KeywordSet, Taxonomy};

/// Reason keywords consulted when the context tag alone is ambiguous
///
/// Matching is case-insensitive substring containment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    /// Marks an adjustment as a decrease
    pub deduction: Vec<String>,
    pub allowed_shortage: Vec<String>,
    /// Vetoes `allowed_shortage`, checked first
    pub disallowed_shortage: Vec<String>,
    pub returns: Vec<String>,
    pub waste: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        fn words(list: &[&str]) -> Vec<String> {
            list.iter().map(|word| word.to_string()).collect()
        }

        Self {
            deduction: words(&["deduction", "shortfall", "decrease", "write-off", "minus"]),
            allowed_shortage: words(&["allowed", "permitted", "tolerated"]),
            disallowed_shortage: words(&["disallowed", "not allowed", "unallowed"]),
            returns: words(&["return"]),
            waste: words(&["waste", "scrap", "spoil"]),
        }
    }
}

impl KeywordConfig {
    /// Lowercase every keyword once so matching only lowercases the reason
    fn normalized(mut self) -> Self {
        for list in [
            &mut self.deduction,
            &mut self.allowed_shortage,
            &mut self.disallowed_shortage,
            &mut self.returns,
            &mut self.waste,
        ] {
            for word in list.iter_mut() {
                *word = word.trim().to_lowercase();
            }
            list.retain(|word| !word.is_empty());
        }
        self
    }

    /// Whether `reason` hits the keyword set
    pub fn matches(&self, set: KeywordSet, reason: &str) -> bool {
        let reason = reason.to_lowercase();
        let any = |list: &[String]| list.iter().any(|word| reason.contains(word.as_str()));
        match set {
            KeywordSet::Deduction => any(&self.deduction),
            KeywordSet::AllowedShortage => {
                !any(&self.disallowed_shortage) && any(&self.allowed_shortage)
            }
            KeywordSet::Returns => any(&self.returns),
            KeywordSet::Waste => any(&self.waste),
        }
    }
}

/// Pure classifier over a taxonomy and keyword configuration
#[derive(Debug, Clone)]
pub struct ClassificationRules {
    taxonomy: Taxonomy,
    keywords: KeywordConfig,
}

impl ClassificationRules {
    pub fn new(taxonomy: Taxonomy, keywords: KeywordConfig) -> Self {
        Self {
            taxonomy,
            keywords: keywords.normalized(),
        }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn keywords(&self) -> &KeywordConfig {
        &self.keywords
    }

    /// Category key for a movement line
    ///
    /// Every line of a movement shares the movement's classification, so
    /// only movement-level fields are consulted.
    pub fn classify(&self, movement: &Movement) -> &str {
        if let Some(rule) = self.taxonomy.context_rule(&movement.context) {
            return self.apply_rule(rule, movement);
        }

        let fallback = self.taxonomy.fallback();
        let is_outbound = movement.kind == MovementKind::Out || movement.mode == MovementMode::Out;

        if movement.kind == MovementKind::Return
            || (movement.kind == MovementKind::In
                && self.keywords.matches(KeywordSet::Returns, &movement.reason))
        {
            return if is_outbound {
                fallback.return_out.as_str()
            } else {
                fallback.return_in.as_str()
            };
        }

        match movement.kind {
            MovementKind::In => fallback.inbound.as_str(),
            MovementKind::Out => fallback.outbound.as_str(),
            MovementKind::Adjustment => fallback.adjustment.as_str(),
            MovementKind::Transfer => match movement.mode {
                MovementMode::In => fallback.inbound.as_str(),
                MovementMode::Out => fallback.outbound.as_str(),
                MovementMode::Unset => fallback.lateral_transfer.as_str(),
            },
            // Handled by the return branch above
            MovementKind::Return => fallback.return_in.as_str(),
        }
    }

    fn apply_rule<'a>(&'a self, rule: &'a ContextRule, movement: &Movement) -> &'a str {
        match rule {
            ContextRule::Fixed { category } => category.as_str(),
            ContextRule::ByMode {
                inbound,
                outbound,
                unset,
            } => match movement.mode {
                MovementMode::In => inbound.as_str(),
                MovementMode::Out => outbound.as_str(),
                MovementMode::Unset => unset.as_str(),
            },
            ContextRule::ByReason {
                keywords,
                matched,
                otherwise,
            } => {
                if self.keywords.matches(*keywords, &movement.reason) {
                    matched.as_str()
                } else {
                    otherwise.as_str()
                }
            }
            ContextRule::Return { inbound, outbound } => {
                if movement.kind == MovementKind::Out || movement.mode == MovementMode::Out {
                    outbound.as_str()
                } else {
                    inbound.as_str()
                }
            }
        }
    }
}
