//! The financial-model document types
//!
//! A study is a graph of top-level entities linked by raw id arrays: one
//! [`Project`] referencing its [`Alternative`]s, each alternative referencing
//! the [`Cost`]s it carries. Every entity is persisted as an [`Entity`]
//! value, the tagged union the editor's optics navigate.

use serde::{Deserialize, Serialize};
use tally_core::EntityId;

/// Top-level persisted document: the tagged union of every entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    /// The study itself
    Project(Project),
    /// One design alternative under comparison
    Alternative(Alternative),
    /// One cost item carried by alternatives
    Cost(Cost),
}

impl Entity {
    /// Borrow the project payload, if this entity is one.
    pub fn as_project(&self) -> Option<&Project> {
        match self {
            Entity::Project(p) => Some(p),
            _ => None,
        }
    }

    /// Borrow the alternative payload, if this entity is one.
    pub fn as_alternative(&self) -> Option<&Alternative> {
        match self {
            Entity::Alternative(a) => Some(a),
            _ => None,
        }
    }

    /// Borrow the cost payload, if this entity is one.
    pub fn as_cost(&self) -> Option<&Cost> {
        match self {
            Entity::Cost(c) => Some(c),
            _ => None,
        }
    }
}

/// Study-wide settings and the list of alternatives under comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Study name
    pub name: String,

    /// Analyst preparing the study
    pub analyst: Option<String>,

    /// Length of the study period
    pub study_period_years: u32,

    /// Real discount rate applied when discounting cash flows
    pub discount_rate: f64,

    /// Whether amounts are entered in constant dollars
    pub constant_dollars: bool,

    /// Alternatives belonging to this study
    pub alternative_ids: Vec<EntityId>,
}

impl Project {
    /// New project with conventional defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            analyst: None,
            study_period_years: 25,
            discount_rate: 0.03,
            constant_dollars: true,
            alternative_ids: Vec::new(),
        }
    }
}

/// One design alternative: a named bundle of cost items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    /// Alternative name
    pub name: String,

    /// Free-form description
    pub description: Option<String>,

    /// Whether this alternative is the comparison baseline
    pub baseline: bool,

    /// Costs carried by this alternative
    pub cost_ids: Vec<EntityId>,
}

impl Alternative {
    /// New non-baseline alternative with no costs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            baseline: false,
            cost_ids: Vec::new(),
        }
    }

    /// Mark this alternative as the baseline.
    pub fn baseline(mut self) -> Self {
        self.baseline = true;
        self
    }
}

/// One cost item; the editable fields depend on its [`CostKind`] variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    /// Cost name
    pub name: String,

    /// Free-form description
    pub description: Option<String>,

    /// Category-specific cost data
    pub kind: CostKind,
}

impl Cost {
    /// New cost of the given kind.
    pub fn new(name: impl Into<String>, kind: CostKind) -> Self {
        Self {
            name: name.into(),
            description: None,
            kind,
        }
    }
}

/// Category-specific cost data; the tagged variant the editor's prisms
/// discriminate on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum CostKind {
    /// Up-front investment with a service life and residual value
    Capital {
        /// Initial investment amount
        initial: f64,
        /// Expected service life
        expected_life_years: u32,
        /// Residual value at the end of the study period, if any
        residual_value: Option<f64>,
        /// Annual rate of change applied to the amount
        annual_rate_of_change: f64,
    },
    /// Annually recurring energy consumption
    Energy {
        /// Fuel consumed
        fuel: FuelType,
        /// Annual consumption in fuel units
        annual_consumption: f64,
        /// Cost per fuel unit
        unit_cost: f64,
        /// Annual price escalation rate
        escalation_rate: f64,
    },
    /// Annually recurring water usage
    Water {
        /// Annual usage volume
        annual_usage: f64,
        /// Cost per volume unit
        unit_cost: f64,
    },
    /// Cost recurring at a fixed interval
    Recurring {
        /// Amount per occurrence
        amount: f64,
        /// Years between occurrences
        interval_years: u32,
        /// Annual rate of change applied to the amount
        annual_rate_of_change: f64,
    },
    /// One-time cost at a known year
    NonRecurring {
        /// Amount of the single occurrence
        amount: f64,
        /// Study year in which the cost occurs
        occurs_in_year: u32,
    },
}

/// Fuels an energy cost can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    /// Grid electricity
    Electricity,
    /// Piped natural gas
    NaturalGas,
    /// Distillate fuel oil
    DistillateOil,
    /// Residual fuel oil
    ResidualOil,
    /// Liquid propane
    Propane,
    /// Coal
    Coal,
    /// Any other fuel
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_accessors() {
        let cost = Entity::Cost(Cost::new(
            "Pump",
            CostKind::NonRecurring {
                amount: 500.0,
                occurs_in_year: 3,
            },
        ));
        assert!(cost.as_cost().is_some());
        assert!(cost.as_project().is_none());
        assert!(cost.as_alternative().is_none());
    }

    #[test]
    fn test_entity_serde_roundtrip() {
        let entity = Entity::Cost(Cost::new(
            "Chiller",
            CostKind::Energy {
                fuel: FuelType::Electricity,
                annual_consumption: 120_000.0,
                unit_cost: 0.11,
                escalation_rate: 0.015,
            },
        ));

        let json = serde_json::to_string(&entity).unwrap();
        let back: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entity);
    }

    #[test]
    fn test_cost_kind_is_tagged_by_category() {
        let kind = CostKind::Water {
            annual_usage: 900.0,
            unit_cost: 4.2,
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["category"], "water");
    }
}
