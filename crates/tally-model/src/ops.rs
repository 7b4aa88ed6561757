//! Multi-entity operations over the study graph
//!
//! Entities reference each other through raw id arrays, so structural edits
//! (create-and-link, delete-with-cascade) always touch several entities.
//! Every operation here commits through one atomic transaction: either the
//! whole group becomes visible together or, on failure, nothing does.

use tally_core::{DocumentStore, EntityId, Result, TxOp};

use crate::model::{Alternative, Cost, Entity, Project};

/// Store holding one study's entity graph.
pub type ModelStore = DocumentStore<Entity>;

/// Create a new project entity.
pub async fn new_project(store: &ModelStore, name: impl Into<String>) -> Result<EntityId> {
    store.insert(Entity::Project(Project::new(name))).await
}

/// Create an alternative and link it into its project as one unit.
pub async fn add_alternative(
    store: &ModelStore,
    project_id: EntityId,
    alternative: Alternative,
) -> Result<EntityId> {
    let id = store.allocate_id();
    store
        .transact(vec![
            TxOp::insert(id, Entity::Alternative(alternative)),
            TxOp::modify(project_id, move |e| match e {
                Entity::Project(mut p) => {
                    p.alternative_ids.push(id);
                    Entity::Project(p)
                }
                other => other,
            }),
        ])
        .await?;
    tracing::info!(alternative = %id, project = %project_id, "alternative added");
    Ok(id)
}

/// Create a cost and append its id to every given alternative as one unit.
pub async fn add_cost(
    store: &ModelStore,
    alternative_ids: &[EntityId],
    cost: Cost,
) -> Result<EntityId> {
    let id = store.allocate_id();
    let mut ops = vec![TxOp::insert(id, Entity::Cost(cost))];
    for alt_id in alternative_ids {
        ops.push(TxOp::modify(*alt_id, move |e| match e {
            Entity::Alternative(mut a) => {
                a.cost_ids.push(id);
                Entity::Alternative(a)
            }
            other => other,
        }));
    }
    store.transact(ops).await?;
    tracing::info!(cost = %id, alternatives = alternative_ids.len(), "cost added");
    Ok(id)
}

/// Link an existing cost into an additional alternative.
pub async fn link_cost(store: &ModelStore, alternative_id: EntityId, cost_id: EntityId) -> Result<()> {
    if !store.contains(cost_id) {
        return Err(tally_core::CoreError::NotFound(cost_id));
    }
    store
        .modify(alternative_id, move |e| match e {
            Entity::Alternative(mut a) => {
                if !a.cost_ids.contains(&cost_id) {
                    a.cost_ids.push(cost_id);
                }
                Entity::Alternative(a)
            }
            other => other,
        })
        .await
}

/// Delete a cost, removing its id from every referencing alternative in the
/// same transaction.
pub async fn delete_cost(store: &ModelStore, cost_id: EntityId) -> Result<()> {
    let mut ops = Vec::new();
    for id in store.ids() {
        let Ok(entity) = store.get(id) else { continue };
        if let Entity::Alternative(alt) = entity {
            if alt.cost_ids.contains(&cost_id) {
                ops.push(TxOp::modify(id, move |e| match e {
                    Entity::Alternative(mut a) => {
                        a.cost_ids.retain(|c| *c != cost_id);
                        Entity::Alternative(a)
                    }
                    other => other,
                }));
            }
        }
    }
    ops.push(TxOp::delete(cost_id));
    store.transact(ops).await?;
    tracing::info!(cost = %cost_id, "cost deleted");
    Ok(())
}

/// Delete an alternative, removing its id from every referencing project in
/// the same transaction. Costs it carried stay available to other
/// alternatives.
pub async fn delete_alternative(store: &ModelStore, alternative_id: EntityId) -> Result<()> {
    let mut ops = Vec::new();
    for id in store.ids() {
        let Ok(entity) = store.get(id) else { continue };
        if let Entity::Project(project) = entity {
            if project.alternative_ids.contains(&alternative_id) {
                ops.push(TxOp::modify(id, move |e| match e {
                    Entity::Project(mut p) => {
                        p.alternative_ids.retain(|a| *a != alternative_id);
                        Entity::Project(p)
                    }
                    other => other,
                }));
            }
        }
    }
    ops.push(TxOp::delete(alternative_id));
    store.transact(ops).await?;
    tracing::info!(alternative = %alternative_id, "alternative deleted");
    Ok(())
}
