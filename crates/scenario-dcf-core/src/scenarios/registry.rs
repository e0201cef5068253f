use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::DcfError;
use crate::types::Rate;
use crate::DcfResult;

/// Key of the scenario the sensitivity tables are anchored on.
pub const BASE_SCENARIO_KEY: &str = "base";

/// A named set of additive adjustments applied on top of the historical
/// baseline. All deltas are signed decimal fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Added to the average historical revenue growth
    #[serde(default)]
    pub revenue_growth_adj: Rate,
    /// Added to the average historical operating margin
    #[serde(default)]
    pub margin_adj: Rate,
    /// Added to the computed WACC
    #[serde(default)]
    pub wacc_adj: Rate,
    /// Added to the configured terminal growth rate
    #[serde(default)]
    pub terminal_growth_adj: Rate,
}

impl ScenarioDefinition {
    pub fn new(key: &str, name: &str, description: &str) -> Self {
        ScenarioDefinition {
            key: key.into(),
            name: name.into(),
            description: description.into(),
            revenue_growth_adj: Decimal::ZERO,
            margin_adj: Decimal::ZERO,
            wacc_adj: Decimal::ZERO,
            terminal_growth_adj: Decimal::ZERO,
        }
    }

    pub fn with_adjustments(
        mut self,
        revenue_growth_adj: Rate,
        margin_adj: Rate,
        wacc_adj: Rate,
        terminal_growth_adj: Rate,
    ) -> Self {
        self.revenue_growth_adj = revenue_growth_adj;
        self.margin_adj = margin_adj;
        self.wacc_adj = wacc_adj;
        self.terminal_growth_adj = terminal_growth_adj;
        self
    }
}

/// Read-only catalogue of scenarios, keyed by scenario key.
///
/// Registries are values: adding a scenario produces a new registry and
/// leaves the original untouched. Iteration follows registration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ScenarioDefinition>", into = "Vec<ScenarioDefinition>")]
pub struct ScenarioRegistry {
    entries: BTreeMap<String, ScenarioDefinition>,
    order: Vec<String>,
}

impl ScenarioRegistry {
    /// A registry with no scenarios.
    pub fn empty() -> Self {
        ScenarioRegistry {
            entries: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    /// The five built-in macro scenarios.
    pub fn canonical() -> Self {
        let defs = vec![
            ScenarioDefinition::new(
                BASE_SCENARIO_KEY,
                "Base Case",
                "Moderate growth, current interest rates maintained",
            ),
            ScenarioDefinition::new(
                "bull",
                "Bull Case",
                "Rising sales & profit, falling interest rates (-100bp)",
            )
            .with_adjustments(dec!(0.03), dec!(0.02), dec!(-0.01), dec!(0.005)),
            ScenarioDefinition::new(
                "bear",
                "Bear Case",
                "Falling sales & profit, rising interest rates (+150bp)",
            )
            .with_adjustments(dec!(-0.03), dec!(-0.02), dec!(0.015), dec!(-0.005)),
            ScenarioDefinition::new(
                "rate_hike",
                "Rising Rates",
                "Stable sales, aggressive rate hikes (+200bp)",
            )
            .with_adjustments(Decimal::ZERO, dec!(-0.005), dec!(0.02), Decimal::ZERO),
            ScenarioDefinition::new(
                "rate_cut",
                "Falling Rates",
                "Stable sales, rate cuts (-150bp)",
            )
            .with_adjustments(Decimal::ZERO, dec!(0.005), dec!(-0.015), Decimal::ZERO),
        ];
        // Built-in keys are distinct.
        Self::from_definitions(defs).unwrap_or_else(|_| Self::empty())
    }

    /// Build a registry from definitions, rejecting duplicate or blank keys.
    pub fn from_definitions(defs: Vec<ScenarioDefinition>) -> DcfResult<Self> {
        defs.into_iter()
            .try_fold(Self::empty(), |registry, def| registry.with_scenario(def))
    }

    /// Return a new registry containing every existing entry plus `def`.
    pub fn with_scenario(&self, def: ScenarioDefinition) -> DcfResult<Self> {
        if def.key.trim().is_empty() {
            return Err(DcfError::InvalidInput {
                field: "scenario.key".into(),
                reason: "Scenario key cannot be blank".into(),
            });
        }
        if self.entries.contains_key(&def.key) {
            return Err(DcfError::InvalidInput {
                field: format!("scenario:{}", def.key),
                reason: "A scenario with this key is already registered".into(),
            });
        }
        let mut next = self.clone();
        next.order.push(def.key.clone());
        next.entries.insert(def.key.clone(), def);
        Ok(next)
    }

    /// Return a new registry with every definition from `other` appended.
    pub fn extended_with(&self, other: &ScenarioRegistry) -> DcfResult<Self> {
        other
            .iter()
            .cloned()
            .try_fold(self.clone(), |registry, def| registry.with_scenario(def))
    }

    pub fn get(&self, key: &str) -> Option<&ScenarioDefinition> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ScenarioDefinition> + '_ {
        self.order.iter().filter_map(|key| self.entries.get(key))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for ScenarioRegistry {
    fn default() -> Self {
        Self::canonical()
    }
}

impl TryFrom<Vec<ScenarioDefinition>> for ScenarioRegistry {
    type Error = DcfError;

    fn try_from(defs: Vec<ScenarioDefinition>) -> Result<Self, Self::Error> {
        Self::from_definitions(defs)
    }
}

impl From<ScenarioRegistry> for Vec<ScenarioDefinition> {
    fn from(registry: ScenarioRegistry) -> Self {
        registry.iter().cloned().collect()
    }
}
