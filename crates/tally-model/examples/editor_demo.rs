//! End-to-end wiring demo: build a small study, bind editor fields, edit
//! them optimistically, and watch validation results settle.
//!
//! Run with: `cargo run -p tally-model --example editor_demo`

use std::time::Duration;

use tally_core::{DocumentStore, EngineConfig, SqlitePersistence};
use tally_model::{fields, ops, Alternative, Cost, CostKind, Entity, FuelType};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let dir = tempfile::tempdir()?;
    let config = EngineConfig::default().with_database_path(dir.path().join("study.db"));
    let backend: SqlitePersistence<Entity> =
        SqlitePersistence::open(config.database_path.as_ref().unwrap())?;
    let store = DocumentStore::open(backend, &config)?;

    // Assemble the study graph atomically.
    let project = ops::new_project(&store, "HVAC retrofit study").await?;
    let keep = ops::add_alternative(&store, project, Alternative::new("Keep existing").baseline())
        .await?;
    let replace =
        ops::add_alternative(&store, project, Alternative::new("Replace chiller")).await?;

    let chiller = ops::add_cost(
        &store,
        &[replace],
        Cost::new(
            "High-efficiency chiller",
            CostKind::Capital {
                initial: 85_000.0,
                expected_life_years: 20,
                residual_value: Some(5_000.0),
                annual_rate_of_change: 0.0,
            },
        ),
    )
    .await?;

    let electricity = ops::add_cost(
        &store,
        &[keep, replace],
        Cost::new(
            "Electricity",
            CostKind::Energy {
                fuel: FuelType::Electricity,
                annual_consumption: 120_000.0,
                unit_cost: 0.11,
                escalation_rate: 0.015,
            },
        ),
    )
    .await?;

    // Bind editor fields and attach their rules.
    let name = fields::cost_name_field(&store, chiller)?;
    let name_validator =
        fields::attach_rules(&name, fields::cost_name_rules(&store, chiller), &config);

    let rate = fields::discount_rate_field(&store, project)?;
    let rate_validator = fields::attach_rules(&rate, fields::discount_rate_rules(), &config);

    // Optimistic edits: current() reflects them before persistence confirms.
    name.set("Chiller (revised)".to_string());
    rate.set(0.45);
    println!("name after set:  {:?}", name.current());
    println!("rate after set:  {:?}", rate.current());

    store.settle().await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    println!("name validation: {:?}", name_validator.latest());
    println!("rate validation: {:?}", rate_validator.latest());

    // Fix the out-of-range rate and watch validation recover.
    rate.set(0.03);
    store.settle().await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("rate validation: {:?}", rate_validator.latest());

    // Cascade delete: the shared electricity cost vanishes from both
    // alternatives in one transaction.
    ops::delete_cost(&store, electricity).await?;
    for alt in [keep, replace] {
        let entity = store.get(alt)?;
        let alt_doc = entity.as_alternative().unwrap();
        println!("{}: costs {:?}", alt_doc.name, alt_doc.cost_ids);
    }

    Ok(())
}
