//! An end-to-end editing session over the study document model.

use std::time::Duration;

use tally_core::{EngineConfig, FieldBinder};
use tally_model::ops::{self, ModelStore};
use tally_model::{optics, Alternative, Cost, CostKind, Entity};

fn capital(name: &str, initial: f64) -> Cost {
    Cost::new(
        name,
        CostKind::Capital {
            initial,
            expected_life_years: 15,
            residual_value: None,
            annual_rate_of_change: 0.0,
        },
    )
}

async fn eventually(check: impl Fn() -> bool) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition never reached");
}

#[tokio::test]
async fn two_components_editing_one_cost_list() {
    let config = EngineConfig::default();
    let store = ModelStore::in_memory(&config);
    let project = ops::new_project(&store, "study").await.unwrap();
    let alt = ops::add_alternative(&store, project, Alternative::new("alt"))
        .await
        .unwrap();
    let c1 = ops::add_cost(&store, &[], capital("c1", 100.0)).await.unwrap();
    let c2 = ops::add_cost(&store, &[], capital("c2", 200.0)).await.unwrap();

    // Two independent components bound to the same cost list.
    let x = FieldBinder::bind(&store, alt, optics::alternative_cost_ids()).unwrap();
    let y = FieldBinder::bind(&store, alt, optics::alternative_cost_ids()).unwrap();

    x.set(vec![c1]);
    y.set(vec![c1, c2]);
    store.settle().await.unwrap();

    // Last write wins and both components converge on it.
    let committed = store
        .get(alt)
        .unwrap()
        .as_alternative()
        .unwrap()
        .cost_ids
        .clone();
    assert_eq!(committed, vec![c1, c2]);
    eventually(|| x.current() == Some(vec![c1, c2])).await;
    eventually(|| y.current() == Some(vec![c1, c2])).await;
}

#[tokio::test]
async fn concurrent_category_switch_drops_the_stale_write() {
    let config = EngineConfig::default();
    let store = ModelStore::in_memory(&config);
    let cost = ops::add_cost(&store, &[], capital("Boiler", 12_000.0))
        .await
        .unwrap();

    let initial = FieldBinder::bind(&store, cost, optics::capital_initial()).unwrap();
    assert_eq!(initial.current(), Some(12_000.0));

    // Another editor switches the category out from under this field.
    let kind_field = FieldBinder::bind(&store, cost, optics::cost_kind()).unwrap();
    kind_field.set(CostKind::NonRecurring {
        amount: 12_000.0,
        occurs_in_year: 1,
    });
    store.settle().await.unwrap();

    // The capital write arrives late and must be dropped silently.
    initial.set(99_999.0);
    store.settle().await.unwrap();

    let entity = store.get(cost).unwrap();
    let Entity::Cost(committed) = entity else {
        panic!("cost entity expected")
    };
    assert_eq!(
        committed.kind,
        CostKind::NonRecurring {
            amount: 12_000.0,
            occurs_in_year: 1,
        }
    );
    assert_eq!(committed.name, "Boiler");
}

#[tokio::test]
async fn sibling_field_sees_the_other_components_edit() {
    let config = EngineConfig::default();
    let store = ModelStore::in_memory(&config);
    let cost = ops::add_cost(&store, &[], capital("Boiler", 12_000.0))
        .await
        .unwrap();

    let editor = FieldBinder::bind(&store, cost, optics::cost_name()).unwrap();
    let display = FieldBinder::bind(&store, cost, optics::cost_name()).unwrap();
    let mut display_values = display.value();
    assert_eq!(display_values.recv().await.as_deref(), Some("Boiler"));

    editor.set("Condensing boiler".to_string());
    assert_eq!(
        display_values.recv().await.as_deref(),
        Some("Condensing boiler")
    );
}
