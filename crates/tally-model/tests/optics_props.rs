//! Property tests for the optic laws over the study document model.

use proptest::prelude::*;
use tally_model::optics;
use tally_model::{Cost, CostKind, Entity, FuelType, Project};

fn arb_fuel() -> impl Strategy<Value = FuelType> {
    prop_oneof![
        Just(FuelType::Electricity),
        Just(FuelType::NaturalGas),
        Just(FuelType::DistillateOil),
        Just(FuelType::ResidualOil),
        Just(FuelType::Propane),
        Just(FuelType::Coal),
        Just(FuelType::Other),
    ]
}

fn arb_kind() -> impl Strategy<Value = CostKind> {
    prop_oneof![
        (0.0..1e9f64, 1u32..60, proptest::option::of(0.0..1e6f64), -0.2..0.2f64).prop_map(
            |(initial, expected_life_years, residual_value, annual_rate_of_change)| {
                CostKind::Capital {
                    initial,
                    expected_life_years,
                    residual_value,
                    annual_rate_of_change,
                }
            }
        ),
        (arb_fuel(), 0.0..1e7f64, 0.0..100.0f64, -0.2..0.2f64).prop_map(
            |(fuel, annual_consumption, unit_cost, escalation_rate)| CostKind::Energy {
                fuel,
                annual_consumption,
                unit_cost,
                escalation_rate,
            }
        ),
        (0.0..1e6f64, 0.0..100.0f64).prop_map(|(annual_usage, unit_cost)| CostKind::Water {
            annual_usage,
            unit_cost,
        }),
        (0.0..1e6f64, 1u32..30, -0.2..0.2f64).prop_map(
            |(amount, interval_years, annual_rate_of_change)| CostKind::Recurring {
                amount,
                interval_years,
                annual_rate_of_change,
            }
        ),
        (0.0..1e6f64, 0u32..60).prop_map(|(amount, occurs_in_year)| CostKind::NonRecurring {
            amount,
            occurs_in_year,
        }),
    ]
}

fn arb_cost_entity() -> impl Strategy<Value = Entity> {
    ("[a-zA-Z0-9 ]{0,32}", arb_kind())
        .prop_map(|(name, kind)| Entity::Cost(Cost::new(name, kind)))
}

fn arb_non_capital_entity() -> impl Strategy<Value = Entity> {
    arb_cost_entity().prop_filter("capital costs excluded", |e| {
        !matches!(
            e,
            Entity::Cost(Cost {
                kind: CostKind::Capital { .. },
                ..
            })
        )
    })
}

proptest! {
    #[test]
    fn cost_name_get_set_roundtrip(entity in arb_cost_entity(), name in "[a-zA-Z0-9 ]{0,40}") {
        let optic = optics::cost_name();
        let updated = optic.set(&entity, name.clone());
        prop_assert_eq!(optic.get(&updated), Some(name));
    }

    #[test]
    fn cost_name_set_get_is_identity(entity in arb_cost_entity()) {
        let optic = optics::cost_name();
        let current = optic.get(&entity).unwrap();
        prop_assert_eq!(optic.set(&entity, current), entity);
    }

    #[test]
    fn capital_write_on_other_categories_is_identity(
        entity in arb_non_capital_entity(),
        amount in 0.0..1e9f64,
    ) {
        let optic = optics::capital_initial();
        prop_assert_eq!(optic.get(&entity), None);
        prop_assert_eq!(optic.set(&entity, amount), entity);
    }

    #[test]
    fn cost_write_on_project_is_identity(
        name in "[a-zA-Z0-9 ]{1,32}",
        new_name in "[a-zA-Z0-9 ]{0,32}",
    ) {
        let project = Entity::Project(Project::new(name));
        prop_assert_eq!(optics::cost_name().set(&project, new_name), project);
    }

    #[test]
    fn discount_rate_roundtrip_on_project(
        name in "[a-zA-Z0-9 ]{1,32}",
        rate in 0.0..0.5f64,
    ) {
        let project = Entity::Project(Project::new(name));
        let optic = optics::project_discount_rate();
        let updated = optic.set(&project, rate);
        prop_assert_eq!(optic.get(&updated), Some(rate));
        // Unrelated fields untouched by the write.
        prop_assert_eq!(
            updated.as_project().unwrap().study_period_years,
            project.as_project().unwrap().study_period_years
        );
    }

    #[test]
    fn kind_write_preserves_name_and_description(entity in arb_cost_entity(), kind in arb_kind()) {
        let updated = optics::cost_kind().set(&entity, kind.clone());
        prop_assert_eq!(optics::cost_kind().get(&updated), Some(kind));
        prop_assert_eq!(
            optics::cost_name().get(&updated),
            optics::cost_name().get(&entity)
        );
    }
}
