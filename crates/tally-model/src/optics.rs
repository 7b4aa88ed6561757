//! Optics over the financial-model document
//!
//! Variant prisms discriminate the [`Entity`] union and the [`CostKind`]
//! union; field lenses focus individual editable fields. The composed paths
//! exported here are the ones the editor's field binders use. Every path
//! through a variant is partial: a write issued while the live document sits
//! on a different variant is silently dropped.

use tally_core::{EntityId, Lens, Prism};

use crate::model::{Alternative, Cost, CostKind, Entity, Project};

// ── Entity variant prisms ────────────────────────────────────────────────

/// Focus the project payload of an entity.
pub fn project() -> Prism<Entity, Project> {
    Prism::new(
        |e: &Entity| match e {
            Entity::Project(p) => Some(p.clone()),
            _ => None,
        },
        |e, p| match e {
            Entity::Project(_) => Entity::Project(p),
            _ => e.clone(),
        },
    )
}

/// Focus the alternative payload of an entity.
pub fn alternative() -> Prism<Entity, Alternative> {
    Prism::new(
        |e: &Entity| match e {
            Entity::Alternative(a) => Some(a.clone()),
            _ => None,
        },
        |e, a| match e {
            Entity::Alternative(_) => Entity::Alternative(a),
            _ => e.clone(),
        },
    )
}

/// Focus the cost payload of an entity.
pub fn cost() -> Prism<Entity, Cost> {
    Prism::new(
        |e: &Entity| match e {
            Entity::Cost(c) => Some(c.clone()),
            _ => None,
        },
        |e, c| match e {
            Entity::Cost(_) => Entity::Cost(c),
            _ => e.clone(),
        },
    )
}

// ── Project fields ───────────────────────────────────────────────────────

/// Project name.
pub fn project_name() -> Prism<Entity, String> {
    project().then_lens(Lens::new(
        |p: &Project| p.name.clone(),
        |p, name| Project { name, ..p.clone() },
    ))
}

/// Project discount rate.
pub fn project_discount_rate() -> Prism<Entity, f64> {
    project().then_lens(Lens::new(
        |p: &Project| p.discount_rate,
        |p, discount_rate| Project {
            discount_rate,
            ..p.clone()
        },
    ))
}

/// Project study period in years.
pub fn project_study_period() -> Prism<Entity, u32> {
    project().then_lens(Lens::new(
        |p: &Project| p.study_period_years,
        |p, study_period_years| Project {
            study_period_years,
            ..p.clone()
        },
    ))
}

/// Ids of the project's alternatives.
pub fn project_alternative_ids() -> Prism<Entity, Vec<EntityId>> {
    project().then_lens(Lens::new(
        |p: &Project| p.alternative_ids.clone(),
        |p, alternative_ids| Project {
            alternative_ids,
            ..p.clone()
        },
    ))
}

// ── Alternative fields ───────────────────────────────────────────────────

/// Alternative name.
pub fn alternative_name() -> Prism<Entity, String> {
    alternative().then_lens(Lens::new(
        |a: &Alternative| a.name.clone(),
        |a, name| Alternative { name, ..a.clone() },
    ))
}

/// Whether the alternative is the comparison baseline.
pub fn alternative_baseline() -> Prism<Entity, bool> {
    alternative().then_lens(Lens::new(
        |a: &Alternative| a.baseline,
        |a, baseline| Alternative {
            baseline,
            ..a.clone()
        },
    ))
}

/// Ids of the costs the alternative carries.
pub fn alternative_cost_ids() -> Prism<Entity, Vec<EntityId>> {
    alternative().then_lens(Lens::new(
        |a: &Alternative| a.cost_ids.clone(),
        |a, cost_ids| Alternative {
            cost_ids,
            ..a.clone()
        },
    ))
}

// ── Cost fields ──────────────────────────────────────────────────────────

/// Cost name.
pub fn cost_name() -> Prism<Entity, String> {
    cost().then_lens(Lens::new(
        |c: &Cost| c.name.clone(),
        |c, name| Cost { name, ..c.clone() },
    ))
}

/// Optional cost description, exposed as an editable optional leaf.
pub fn cost_description() -> Prism<Entity, Option<String>> {
    cost().then_lens(Lens::new(
        |c: &Cost| c.description.clone(),
        |c, description| Cost {
            description,
            ..c.clone()
        },
    ))
}

fn cost_kind_lens() -> Lens<Cost, CostKind> {
    Lens::new(
        |c: &Cost| c.kind.clone(),
        |c, kind| Cost { kind, ..c.clone() },
    )
}

/// Category-specific cost data.
pub fn cost_kind() -> Prism<Entity, CostKind> {
    cost().then_lens(cost_kind_lens())
}

// ── CostKind variant fields ──────────────────────────────────────────────

/// Initial investment of a capital cost.
pub fn capital_initial() -> Prism<Entity, f64> {
    cost_kind().then(Prism::new(
        |k: &CostKind| match k {
            CostKind::Capital { initial, .. } => Some(*initial),
            _ => None,
        },
        |k, initial| match k {
            CostKind::Capital {
                expected_life_years,
                residual_value,
                annual_rate_of_change,
                ..
            } => CostKind::Capital {
                initial,
                expected_life_years: *expected_life_years,
                residual_value: *residual_value,
                annual_rate_of_change: *annual_rate_of_change,
            },
            _ => k.clone(),
        },
    ))
}

/// Expected service life of a capital cost.
pub fn capital_expected_life() -> Prism<Entity, u32> {
    cost_kind().then(Prism::new(
        |k: &CostKind| match k {
            CostKind::Capital {
                expected_life_years,
                ..
            } => Some(*expected_life_years),
            _ => None,
        },
        |k, expected_life_years| match k {
            CostKind::Capital {
                initial,
                residual_value,
                annual_rate_of_change,
                ..
            } => CostKind::Capital {
                initial: *initial,
                expected_life_years,
                residual_value: *residual_value,
                annual_rate_of_change: *annual_rate_of_change,
            },
            _ => k.clone(),
        },
    ))
}

/// Unit cost of an energy cost.
pub fn energy_unit_cost() -> Prism<Entity, f64> {
    cost_kind().then(Prism::new(
        |k: &CostKind| match k {
            CostKind::Energy { unit_cost, .. } => Some(*unit_cost),
            _ => None,
        },
        |k, unit_cost| match k {
            CostKind::Energy {
                fuel,
                annual_consumption,
                escalation_rate,
                ..
            } => CostKind::Energy {
                fuel: *fuel,
                annual_consumption: *annual_consumption,
                unit_cost,
                escalation_rate: *escalation_rate,
            },
            _ => k.clone(),
        },
    ))
}

/// Annual consumption of an energy cost.
pub fn energy_annual_consumption() -> Prism<Entity, f64> {
    cost_kind().then(Prism::new(
        |k: &CostKind| match k {
            CostKind::Energy {
                annual_consumption, ..
            } => Some(*annual_consumption),
            _ => None,
        },
        |k, annual_consumption| match k {
            CostKind::Energy {
                fuel,
                unit_cost,
                escalation_rate,
                ..
            } => CostKind::Energy {
                fuel: *fuel,
                annual_consumption,
                unit_cost: *unit_cost,
                escalation_rate: *escalation_rate,
            },
            _ => k.clone(),
        },
    ))
}

/// Per-occurrence amount of a recurring cost.
pub fn recurring_amount() -> Prism<Entity, f64> {
    cost_kind().then(Prism::new(
        |k: &CostKind| match k {
            CostKind::Recurring { amount, .. } => Some(*amount),
            _ => None,
        },
        |k, amount| match k {
            CostKind::Recurring {
                interval_years,
                annual_rate_of_change,
                ..
            } => CostKind::Recurring {
                amount,
                interval_years: *interval_years,
                annual_rate_of_change: *annual_rate_of_change,
            },
            _ => k.clone(),
        },
    ))
}
