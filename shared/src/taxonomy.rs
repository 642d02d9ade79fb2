//! Flow-category taxonomy
//!
//! The taxonomy is data: it names the pools, tags every category with the
//! pool legs it moves and their sign, and maps entry-time context tags to
//! categories. It is the only place that knows whether a flow credits or
//! debits a pool, so adding a pool or a category never touches the
//! aggregation code.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::types::{PoolId, Sign};

/// Category keys used by the built-in presets
pub mod keys {
    pub const PURCHASE_IN: &str = "purchase-in";
    pub const WAREHOUSE_ISSUE: &str = "warehouse-issue";
    pub const SILO_IN: &str = "silo-in";
    pub const SILO_OUT: &str = "silo-out";
    pub const LATERAL_TRANSFER: &str = "lateral-transfer";
    pub const SILO_DISPATCH: &str = "silo-dispatch";
    pub const SILO_RECEIPT: &str = "silo-receipt";
    pub const CONTROL_ISSUE: &str = "control-issue";
    pub const CONSUMPTION_PRODUCTION: &str = "consumption-production";
    pub const CONSUMPTION_WASTE: &str = "consumption-waste";
    pub const ADJUSTMENT_CREDIT: &str = "adjustment-credit";
    pub const ADJUSTMENT_DEBIT: &str = "adjustment-debit";
    pub const SILO_ADJUSTMENT_CREDIT: &str = "silo-adjustment-credit";
    pub const SILO_ADJUSTMENT_DEBIT: &str = "silo-adjustment-debit";
    pub const SHORTAGE_ALLOWED: &str = "shortage-allowed";
    pub const SHORTAGE_DISALLOWED: &str = "shortage-disallowed";
    pub const SALE: &str = "sale";
    pub const RETURN_IN: &str = "return-in";
    pub const RETURN_OUT: &str = "return-out";
    pub const GENERIC_INBOUND: &str = "generic-inbound";
    pub const GENERIC_OUTBOUND: &str = "generic-outbound";
    pub const GENERIC_ADJUSTMENT: &str = "generic-adjustment";
}

/// Context tags understood by the built-in presets
pub mod contexts {
    pub const INCOMING_PURCHASE: &str = "incoming-purchase";
    pub const WAREHOUSE_ISSUE: &str = "warehouse-issue";
    pub const SILO_TRANSFER: &str = "silo-transfer";
    pub const SILO_DISPATCH: &str = "silo-dispatch";
    pub const SILO_RECEIPT: &str = "silo-receipt";
    pub const CONTROL_ISSUE: &str = "control-issue";
    pub const CONSUMPTION: &str = "consumption";
    pub const WAREHOUSE_ADJUSTMENT: &str = "warehouse-adjustment";
    pub const SILO_ADJUSTMENT: &str = "silo-adjustment";
    pub const SHORTAGE: &str = "shortage";
    pub const SALE: &str = "sale";
    pub const RETURN: &str = "return";
}

/// A named storage pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDef {
    pub id: PoolId,
    pub name: String,
}

/// One signed effect of a category on one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLeg {
    pub pool: PoolId,
    pub sign: Sign,
}

impl PoolLeg {
    pub fn credit(pool: PoolId) -> Self {
        Self {
            pool,
            sign: Sign::Credit,
        }
    }

    pub fn debit(pool: PoolId) -> Self {
        Self {
            pool,
            sign: Sign::Debit,
        }
    }
}

/// A flow category and its pool/sign tagging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDef {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub legs: Vec<PoolLeg>,
    /// Categories in the same group must net to zero over a closed window
    #[serde(default)]
    pub transfer_group: Option<String>,
    /// Kept for audit only; moves no stock
    #[serde(default)]
    pub audit_only: bool,
}

impl CategoryDef {
    fn new(key: &str, label: &str, legs: Vec<PoolLeg>) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            legs,
            transfer_group: None,
            audit_only: false,
        }
    }

    fn in_group(mut self, group: &str) -> Self {
        self.transfer_group = Some(group.to_string());
        self
    }

    fn audit_only(mut self) -> Self {
        self.audit_only = true;
        self
    }

    /// Signed per-pool deltas for a magnitude booked to this category
    pub fn signed_legs(&self, magnitude: Decimal) -> impl Iterator<Item = (PoolId, Decimal)> + '_ {
        self.legs
            .iter()
            .map(move |leg| (leg.pool, leg.sign.apply(magnitude)))
    }

    /// Net effect across all pools of a unit booking
    fn net_sign(&self) -> Decimal {
        self.signed_legs(Decimal::ONE).map(|(_, delta)| delta).sum()
    }
}

/// Reason keyword sets a rule may consult
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordSet {
    Deduction,
    AllowedShortage,
    Returns,
    Waste,
}

/// How a known context tag maps to a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ContextRule {
    Fixed {
        category: String,
    },
    ByMode {
        inbound: String,
        outbound: String,
        unset: String,
    },
    ByReason {
        keywords: KeywordSet,
        matched: String,
        otherwise: String,
    },
    Return {
        inbound: String,
        outbound: String,
    },
}

impl ContextRule {
    fn fixed(category: &str) -> Self {
        ContextRule::Fixed {
            category: category.to_string(),
        }
    }

    fn by_reason(keywords: KeywordSet, matched: &str, otherwise: &str) -> Self {
        ContextRule::ByReason {
            keywords,
            matched: matched.to_string(),
            otherwise: otherwise.to_string(),
        }
    }

    fn categories(&self) -> Vec<&str> {
        match self {
            ContextRule::Fixed { category } => vec![category.as_str()],
            ContextRule::ByMode {
                inbound,
                outbound,
                unset,
            } => vec![inbound.as_str(), outbound.as_str(), unset.as_str()],
            ContextRule::ByReason {
                matched, otherwise, ..
            } => vec![matched.as_str(), otherwise.as_str()],
            ContextRule::Return { inbound, outbound } => {
                vec![inbound.as_str(), outbound.as_str()]
            }
        }
    }
}

/// Categories used when no context rule applies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallbacks {
    pub inbound: String,
    pub outbound: String,
    pub adjustment: String,
    pub return_in: String,
    pub return_out: String,
    pub lateral_transfer: String,
}

impl Fallbacks {
    fn categories(&self) -> [&str; 6] {
        [
            self.inbound.as_str(),
            self.outbound.as_str(),
            self.adjustment.as_str(),
            self.return_in.as_str(),
            self.return_out.as_str(),
            self.lateral_transfer.as_str(),
        ]
    }
}

/// Serialized form of a taxonomy, validated into [`Taxonomy`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyDef {
    pub name: String,
    pub pools: Vec<PoolDef>,
    pub categories: Vec<CategoryDef>,
    pub contexts: BTreeMap<String, ContextRule>,
    pub fallback: Fallbacks,
}

/// A validated category taxonomy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TaxonomyDef", into = "TaxonomyDef")]
pub struct Taxonomy {
    def: TaxonomyDef,
    index: HashMap<String, usize>,
}

impl TryFrom<TaxonomyDef> for Taxonomy {
    type Error = LedgerError;

    fn try_from(def: TaxonomyDef) -> LedgerResult<Self> {
        Taxonomy::new(def)
    }
}

impl From<Taxonomy> for TaxonomyDef {
    fn from(taxonomy: Taxonomy) -> Self {
        taxonomy.def
    }
}

impl Taxonomy {
    /// Validate a taxonomy definition
    pub fn new(def: TaxonomyDef) -> LedgerResult<Self> {
        let invalid = |msg: String| Err(LedgerError::InvalidTaxonomy(msg));

        if def.pools.is_empty() {
            return invalid(format!("taxonomy '{}' defines no pools", def.name));
        }
        for (position, pool) in def.pools.iter().enumerate() {
            if pool.id.index() != position {
                return invalid(format!(
                    "pool '{}' has id {} but is listed at position {}",
                    pool.name, pool.id.0, position
                ));
            }
        }

        let mut index = HashMap::with_capacity(def.categories.len());
        for (position, category) in def.categories.iter().enumerate() {
            if category.key.is_empty() {
                return invalid("category with empty key".to_string());
            }
            if index.insert(category.key.clone(), position).is_some() {
                return invalid(format!("duplicate category '{}'", category.key));
            }
            if let Some(leg) = category
                .legs
                .iter()
                .find(|leg| leg.pool.index() >= def.pools.len())
            {
                return invalid(format!(
                    "category '{}' references undefined {}",
                    category.key, leg.pool
                ));
            }
            if category.legs.is_empty() && !category.audit_only {
                return invalid(format!(
                    "category '{}' moves no stock but is not audit-only",
                    category.key
                ));
            }
            if category.legs.len() > 1 && !category.net_sign().is_zero() {
                return invalid(format!(
                    "transfer category '{}' legs do not cancel",
                    category.key
                ));
            }
        }

        let missing = {
            let mut referenced: HashSet<&str> = def.fallback.categories().into_iter().collect();
            for rule in def.contexts.values() {
                referenced.extend(rule.categories());
            }
            referenced
                .into_iter()
                .find(|key| !index.contains_key(*key))
                .map(str::to_string)
        };
        if let Some(missing) = missing {
            return invalid(format!("rule references unknown category '{}'", missing));
        }

        Ok(Self { def, index })
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn pools(&self) -> &[PoolDef] {
        &self.def.pools
    }

    pub fn pool_count(&self) -> usize {
        self.def.pools.len()
    }

    pub fn categories(&self) -> &[CategoryDef] {
        &self.def.categories
    }

    pub fn category(&self, key: &str) -> LedgerResult<&CategoryDef> {
        self.index
            .get(key)
            .map(|&position| &self.def.categories[position])
            .ok_or_else(|| LedgerError::UnknownCategory(key.to_string()))
    }

    pub fn context_rule(&self, context: &str) -> Option<&ContextRule> {
        self.def.contexts.get(context)
    }

    pub fn fallback(&self) -> &Fallbacks {
        &self.def.fallback
    }

    /// Raw warehouse + silo domain
    pub fn two_pool() -> Self {
        use self::keys::*;
        let a = PoolId::PRIMARY;
        let b = PoolId::SECONDARY;

        let categories = vec![
            CategoryDef::new(PURCHASE_IN, "Inbound purchase", vec![PoolLeg::credit(a)]),
            CategoryDef::new(
                WAREHOUSE_ISSUE,
                "Issued to silo",
                vec![PoolLeg::debit(a), PoolLeg::credit(b)],
            )
            .in_group("warehouse-silo"),
            CategoryDef::new(
                SILO_IN,
                "Silo to warehouse",
                vec![PoolLeg::credit(a), PoolLeg::debit(b)],
            )
            .in_group("warehouse-silo"),
            CategoryDef::new(
                SILO_OUT,
                "Warehouse to silo",
                vec![PoolLeg::debit(a), PoolLeg::credit(b)],
            )
            .in_group("warehouse-silo"),
            CategoryDef::new(LATERAL_TRANSFER, "Lateral transfer", vec![]).audit_only(),
            CategoryDef::new(SILO_DISPATCH, "Dispatched to silo", vec![PoolLeg::debit(a)])
                .in_group("warehouse-silo-legs"),
            CategoryDef::new(SILO_RECEIPT, "Received in silo", vec![PoolLeg::credit(b)])
                .in_group("warehouse-silo-legs"),
            CategoryDef::new(CONTROL_ISSUE, "Control issue", vec![PoolLeg::debit(b)]),
            CategoryDef::new(
                CONSUMPTION_PRODUCTION,
                "Production consumption",
                vec![PoolLeg::debit(a)],
            ),
            CategoryDef::new(CONSUMPTION_WASTE, "Waste", vec![PoolLeg::debit(a)]),
            CategoryDef::new(ADJUSTMENT_CREDIT, "Adjustment (+)", vec![PoolLeg::credit(a)]),
            CategoryDef::new(ADJUSTMENT_DEBIT, "Adjustment (-)", vec![PoolLeg::debit(a)]),
            CategoryDef::new(
                SILO_ADJUSTMENT_CREDIT,
                "Silo adjustment (+)",
                vec![PoolLeg::credit(b)],
            ),
            CategoryDef::new(
                SILO_ADJUSTMENT_DEBIT,
                "Silo adjustment (-)",
                vec![PoolLeg::debit(b)],
            ),
            CategoryDef::new(SHORTAGE_ALLOWED, "Allowed shortage", vec![PoolLeg::debit(a)]),
            CategoryDef::new(
                SHORTAGE_DISALLOWED,
                "Disallowed shortage",
                vec![PoolLeg::debit(a)],
            ),
            CategoryDef::new(SALE, "Sale", vec![PoolLeg::debit(a)]),
            CategoryDef::new(RETURN_IN, "Return in", vec![PoolLeg::credit(a)]),
            CategoryDef::new(RETURN_OUT, "Return out", vec![PoolLeg::debit(a)]),
            CategoryDef::new(GENERIC_INBOUND, "Other inbound", vec![PoolLeg::credit(a)]),
            CategoryDef::new(GENERIC_OUTBOUND, "Other outbound", vec![PoolLeg::debit(a)]),
            CategoryDef::new(GENERIC_ADJUSTMENT, "Other adjustment", vec![PoolLeg::credit(a)]),
        ];

        let mut rules = common_rules();
        rules.insert(
            contexts::WAREHOUSE_ISSUE.to_string(),
            ContextRule::fixed(WAREHOUSE_ISSUE),
        );
        rules.insert(
            contexts::SILO_TRANSFER.to_string(),
            ContextRule::ByMode {
                inbound: SILO_IN.to_string(),
                outbound: SILO_OUT.to_string(),
                unset: LATERAL_TRANSFER.to_string(),
            },
        );
        rules.insert(
            contexts::SILO_DISPATCH.to_string(),
            ContextRule::fixed(SILO_DISPATCH),
        );
        rules.insert(
            contexts::SILO_RECEIPT.to_string(),
            ContextRule::fixed(SILO_RECEIPT),
        );
        rules.insert(
            contexts::CONTROL_ISSUE.to_string(),
            ContextRule::fixed(CONTROL_ISSUE),
        );
        rules.insert(
            contexts::SILO_ADJUSTMENT.to_string(),
            ContextRule::by_reason(
                KeywordSet::Deduction,
                SILO_ADJUSTMENT_DEBIT,
                SILO_ADJUSTMENT_CREDIT,
            ),
        );

        Self::preset(TaxonomyDef {
            name: "two_pool".to_string(),
            pools: vec![
                PoolDef {
                    id: a,
                    name: "warehouse".to_string(),
                },
                PoolDef {
                    id: b,
                    name: "silo".to_string(),
                },
            ],
            categories,
            contexts: rules,
            fallback: default_fallbacks(),
        })
    }

    /// Parts, finished goods and catering domains
    pub fn single_pool() -> Self {
        use self::keys::*;
        let a = PoolId::PRIMARY;

        let categories = vec![
            CategoryDef::new(PURCHASE_IN, "Inbound purchase", vec![PoolLeg::credit(a)]),
            CategoryDef::new(WAREHOUSE_ISSUE, "Warehouse issue", vec![PoolLeg::debit(a)]),
            CategoryDef::new(LATERAL_TRANSFER, "Lateral transfer", vec![]).audit_only(),
            CategoryDef::new(
                CONSUMPTION_PRODUCTION,
                "Production consumption",
                vec![PoolLeg::debit(a)],
            ),
            CategoryDef::new(CONSUMPTION_WASTE, "Waste", vec![PoolLeg::debit(a)]),
            CategoryDef::new(ADJUSTMENT_CREDIT, "Adjustment (+)", vec![PoolLeg::credit(a)]),
            CategoryDef::new(ADJUSTMENT_DEBIT, "Adjustment (-)", vec![PoolLeg::debit(a)]),
            CategoryDef::new(SHORTAGE_ALLOWED, "Allowed shortage", vec![PoolLeg::debit(a)]),
            CategoryDef::new(
                SHORTAGE_DISALLOWED,
                "Disallowed shortage",
                vec![PoolLeg::debit(a)],
            ),
            CategoryDef::new(SALE, "Sale", vec![PoolLeg::debit(a)]),
            CategoryDef::new(RETURN_IN, "Return in", vec![PoolLeg::credit(a)]),
            CategoryDef::new(RETURN_OUT, "Return out", vec![PoolLeg::debit(a)]),
            CategoryDef::new(GENERIC_INBOUND, "Other inbound", vec![PoolLeg::credit(a)]),
            CategoryDef::new(GENERIC_OUTBOUND, "Other outbound", vec![PoolLeg::debit(a)]),
            CategoryDef::new(GENERIC_ADJUSTMENT, "Other adjustment", vec![PoolLeg::credit(a)]),
        ];

        let mut rules = common_rules();
        rules.insert(
            contexts::WAREHOUSE_ISSUE.to_string(),
            ContextRule::fixed(WAREHOUSE_ISSUE),
        );

        Self::preset(TaxonomyDef {
            name: "single_pool".to_string(),
            pools: vec![PoolDef {
                id: a,
                name: "warehouse".to_string(),
            }],
            categories,
            contexts: rules,
            fallback: default_fallbacks(),
        })
    }

    /// Built-in presets are covered by `test_presets_validate`
    fn preset(def: TaxonomyDef) -> Self {
        let index = def
            .categories
            .iter()
            .enumerate()
            .map(|(position, category)| (category.key.clone(), position))
            .collect();
        Self { def, index }
    }
}

fn common_rules() -> BTreeMap<String, ContextRule> {
    use self::keys::*;
    let mut rules = BTreeMap::new();
    rules.insert(
        contexts::INCOMING_PURCHASE.to_string(),
        ContextRule::fixed(PURCHASE_IN),
    );
    rules.insert(
        contexts::CONSUMPTION.to_string(),
        ContextRule::by_reason(KeywordSet::Waste, CONSUMPTION_WASTE, CONSUMPTION_PRODUCTION),
    );
    rules.insert(
        contexts::WAREHOUSE_ADJUSTMENT.to_string(),
        ContextRule::by_reason(KeywordSet::Deduction, ADJUSTMENT_DEBIT, ADJUSTMENT_CREDIT),
    );
    rules.insert(
        contexts::SHORTAGE.to_string(),
        ContextRule::by_reason(
            KeywordSet::AllowedShortage,
            SHORTAGE_ALLOWED,
            SHORTAGE_DISALLOWED,
        ),
    );
    rules.insert(contexts::SALE.to_string(), ContextRule::fixed(SALE));
    rules.insert(
        contexts::RETURN.to_string(),
        ContextRule::Return {
            inbound: RETURN_IN.to_string(),
            outbound: RETURN_OUT.to_string(),
        },
    );
    rules
}

fn default_fallbacks() -> Fallbacks {
    use self::keys::*;
    Fallbacks {
        inbound: GENERIC_INBOUND.to_string(),
        outbound: GENERIC_OUTBOUND.to_string(),
        adjustment: GENERIC_ADJUSTMENT.to_string(),
        return_in: RETURN_IN.to_string(),
        return_out: RETURN_OUT.to_string(),
        lateral_transfer: LATERAL_TRANSFER.to_string(),
    }
}

/// Built-in taxonomy presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyPreset {
    TwoPool,
    SinglePool,
}

impl TaxonomyPreset {
    pub fn build(self) -> Taxonomy {
        match self {
            TaxonomyPreset::TwoPool => Taxonomy::two_pool(),
            TaxonomyPreset::SinglePool => Taxonomy::single_pool(),
        }
    }
}

impl FromStr for TaxonomyPreset {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "two_pool" => Ok(TaxonomyPreset::TwoPool),
            "single_pool" => Ok(TaxonomyPreset::SinglePool),
            other => Err(LedgerError::InvalidTaxonomy(format!(
                "unknown taxonomy preset '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for taxonomy in [Taxonomy::two_pool(), Taxonomy::single_pool()] {
            let def = TaxonomyDef::from(taxonomy.clone());
            let validated = Taxonomy::new(def).unwrap();
            assert_eq!(validated.pool_count(), taxonomy.pool_count());
        }
    }

    #[test]
    fn test_two_legged_categories_cancel() {
        let taxonomy = Taxonomy::two_pool();
        let issue = taxonomy.category(keys::WAREHOUSE_ISSUE).unwrap();
        let net: Decimal = issue
            .signed_legs(Decimal::from(40))
            .map(|(_, delta)| delta)
            .sum();
        assert!(net.is_zero());
    }

    #[test]
    fn test_rejects_leg_on_missing_pool() {
        let mut def = TaxonomyDef::from(Taxonomy::single_pool());
        def.categories[0].legs.push(PoolLeg::credit(PoolId::SECONDARY));
        assert!(matches!(
            Taxonomy::new(def),
            Err(LedgerError::InvalidTaxonomy(_))
        ));
    }

    #[test]
    fn test_rejects_rule_to_unknown_category() {
        let mut def = TaxonomyDef::from(Taxonomy::single_pool());
        def.contexts
            .insert("mystery".to_string(), ContextRule::fixed("nowhere"));
        assert!(Taxonomy::new(def).is_err());
    }

    #[test]
    fn test_rejects_unbalanced_transfer() {
        let mut def = TaxonomyDef::from(Taxonomy::two_pool());
        def.categories.push(CategoryDef::new(
            "double-credit",
            "Broken",
            vec![
                PoolLeg::credit(PoolId::PRIMARY),
                PoolLeg::credit(PoolId::SECONDARY),
            ],
        ));
        assert!(Taxonomy::new(def).is_err());
    }

    #[test]
    fn test_rejects_duplicate_key() {
        let mut def = TaxonomyDef::from(Taxonomy::single_pool());
        let duplicate = def.categories[0].clone();
        def.categories.push(duplicate);
        assert!(Taxonomy::new(def).is_err());
    }

    #[test]
    fn test_taxonomy_loads_from_json() {
        let json = serde_json::to_string(&Taxonomy::two_pool()).unwrap();
        let loaded: Taxonomy = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.name(), "two_pool");
        assert!(loaded.context_rule(contexts::SILO_TRANSFER).is_some());
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!(
            "two_pool".parse::<TaxonomyPreset>().unwrap(),
            TaxonomyPreset::TwoPool
        );
        assert!("three_pool".parse::<TaxonomyPreset>().is_err());
    }
}
