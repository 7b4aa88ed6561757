//! Editor field bindings and their validation rules
//!
//! One constructor per editor field, pairing a composed optic with the store,
//! plus the rule sets the editor attaches to those fields. Async rules reach
//! into the live store the same way an external uniqueness service would.

use tally_core::{
    AsyncRule, EngineConfig, EntityId, FieldBinder, Result, RuleSet, Validator,
};

use crate::model::Entity;
use crate::ops::ModelStore;
use crate::optics;

/// Bind the name field of a cost entity.
pub fn cost_name_field(store: &ModelStore, id: EntityId) -> Result<FieldBinder<Entity, String>> {
    FieldBinder::bind(store, id, optics::cost_name())
}

/// Bind the name field of an alternative entity.
pub fn alternative_name_field(
    store: &ModelStore,
    id: EntityId,
) -> Result<FieldBinder<Entity, String>> {
    FieldBinder::bind(store, id, optics::alternative_name())
}

/// Bind the discount-rate field of the project entity.
pub fn discount_rate_field(store: &ModelStore, id: EntityId) -> Result<FieldBinder<Entity, f64>> {
    FieldBinder::bind(store, id, optics::project_discount_rate())
}

/// Bind the initial-investment field of a capital cost.
pub fn capital_initial_field(store: &ModelStore, id: EntityId) -> Result<FieldBinder<Entity, f64>> {
    FieldBinder::bind(store, id, optics::capital_initial())
}

/// Bind the unit-cost field of an energy cost.
pub fn energy_unit_cost_field(
    store: &ModelStore,
    id: EntityId,
) -> Result<FieldBinder<Entity, f64>> {
    FieldBinder::bind(store, id, optics::energy_unit_cost())
}

/// Attach a rule set to a bound field.
pub fn attach_rules<B>(
    binder: &FieldBinder<Entity, B>,
    rules: RuleSet<B>,
    config: &EngineConfig,
) -> Validator<B>
where
    B: Clone + PartialEq + Send + Sync + 'static,
{
    Validator::attach(binder.value(), rules, config)
}

/// Rules every name field shares.
pub fn required_name_rules() -> RuleSet<String> {
    RuleSet::new()
        .rule("name is required", |name: &String| !name.trim().is_empty())
        .rule("name must be 64 characters or fewer", |name: &String| {
            name.chars().count() <= 64
        })
}

/// Name rules for a cost, including the async uniqueness check against its
/// sibling costs.
pub fn cost_name_rules(store: &ModelStore, editing: EntityId) -> RuleSet<String> {
    required_name_rules().async_rule(unique_cost_name(store, editing))
}

/// Discount-rate bounds.
pub fn discount_rate_rules() -> RuleSet<f64> {
    RuleSet::new()
        .rule("discount rate must not be negative", |rate: &f64| {
            *rate >= 0.0
        })
        .rule("discount rate above 30% is not supported", |rate: &f64| {
            *rate <= 0.30
        })
}

/// Amount fields must not go negative.
pub fn non_negative_amount_rules(field: &str) -> RuleSet<f64> {
    RuleSet::new().rule(format!("{field} must not be negative"), |amount: &f64| {
        *amount >= 0.0
    })
}

/// Uniqueness scan over every other cost in the store.
fn unique_cost_name(store: &ModelStore, editing: EntityId) -> AsyncRule<String> {
    let store = store.clone();
    AsyncRule::new(move |name: String| {
        let store = store.clone();
        async move {
            let duplicate = store
                .ids()
                .into_iter()
                .filter(|id| *id != editing)
                .filter_map(|id| store.get(id).ok())
                .filter_map(|entity| entity.as_cost().map(|c| c.name.clone()))
                .any(|other| other == name);
            duplicate.then(|| format!("a cost named '{name}' already exists"))
        }
    })
}
