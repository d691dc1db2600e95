//! Schema-coverage analysis: how much of a schema a scenario actually
//! exercises. Every relation reference and every permission declared in the
//! schema is an expectation; the scenario's relationship tuples and assertion
//! checks cover them or leave them uncovered.

use serde::Serialize;

use authgraph_core::parse_schema;
use authgraph_core::schema::types::EntityDefinition;

use crate::error::PlaygroundError;
use crate::scenario::Scenario;
use crate::tuple::{ObjectRef, RelationshipTuple};

/// Coverage of one entity. Percentages are integer, floor-rounded; an entity
/// with nothing to cover counts as fully covered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityCoverage {
    pub entity: String,
    pub uncovered_relationships: Vec<String>,
    pub relationships_percent: u32,
    pub uncovered_assertions: Vec<String>,
    pub assertions_percent: u32,
}

/// Whole-schema coverage: per-entity breakdown plus totals averaged over the
/// entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    pub entities: Vec<EntityCoverage>,
    pub total_relationships_percent: u32,
    pub total_assertions_percent: u32,
}

/// Analyzes which relation references and permissions of the scenario's
/// schema its relationship tuples and assertions exercise. Malformed tuples
/// and assertion targets are skipped rather than reported; the scenario
/// runner owns that diagnosis.
pub fn scenario_coverage(scenario: &Scenario) -> Result<CoverageReport, PlaygroundError> {
    let schema = parse_schema(&scenario.schema)?;

    let entities: Vec<EntityCoverage> = schema
        .entities
        .iter()
        .map(|entity| entity_coverage(entity, scenario))
        .collect();

    let total_relationships_percent =
        average(entities.iter().map(|e| e.relationships_percent));
    let total_assertions_percent = average(entities.iter().map(|e| e.assertions_percent));

    Ok(CoverageReport {
        entities,
        total_relationships_percent,
        total_assertions_percent,
    })
}

fn entity_coverage(entity: &EntityDefinition, scenario: &Scenario) -> EntityCoverage {
    let expected_relationships: Vec<String> = entity
        .relations
        .iter()
        .flat_map(|relation| {
            relation.references.iter().map(|reference| {
                relationship_key(
                    &entity.name,
                    &relation.name,
                    &reference.type_name,
                    reference.relation.as_deref(),
                )
            })
        })
        .collect();
    let covered_relationships = covered_relationships(&entity.name, scenario);
    let uncovered_relationships: Vec<String> = expected_relationships
        .iter()
        .filter(|key| !covered_relationships.contains(*key))
        .cloned()
        .collect();

    let expected_assertions: Vec<String> = entity
        .permissions
        .iter()
        .map(|permission| assertion_key(&entity.name, &permission.name))
        .collect();
    let covered_assertions = covered_assertions(&entity.name, scenario);
    let uncovered_assertions: Vec<String> = expected_assertions
        .iter()
        .filter(|key| !covered_assertions.contains(*key))
        .cloned()
        .collect();

    EntityCoverage {
        entity: entity.name.clone(),
        relationships_percent: percent(&expected_relationships, &uncovered_relationships),
        uncovered_relationships,
        assertions_percent: percent(&expected_assertions, &uncovered_assertions),
        uncovered_assertions,
    }
}

/// Type-level keys of the scenario tuples belonging to this entity type:
/// `document:1#owner@user:ada` covers `document#owner@user`.
fn covered_relationships(entity: &str, scenario: &Scenario) -> Vec<String> {
    scenario
        .relationships
        .iter()
        .filter_map(|raw| raw.parse::<RelationshipTuple>().ok())
        .filter(|tuple| tuple.object.object_type == entity)
        .map(|tuple| {
            relationship_key(
                &tuple.object.object_type,
                &tuple.relation,
                &tuple.subject.subject_type,
                tuple.subject.subject_relation.as_deref(),
            )
        })
        .collect()
}

fn covered_assertions(entity: &str, scenario: &Scenario) -> Vec<String> {
    let mut covered = Vec::new();
    for assertion in &scenario.assertions {
        let Ok(object) = assertion.entity.parse::<ObjectRef>() else {
            continue;
        };
        if object.object_type != entity {
            continue;
        }
        for permission in assertion.assert.keys() {
            covered.push(assertion_key(entity, permission));
        }
    }
    covered
}

fn relationship_key(
    entity: &str,
    relation: &str,
    subject_type: &str,
    subject_relation: Option<&str>,
) -> String {
    match subject_relation {
        Some(subject_relation) => format!("{entity}#{relation}@{subject_type}#{subject_relation}"),
        None => format!("{entity}#{relation}@{subject_type}"),
    }
}

fn assertion_key(entity: &str, permission: &str) -> String {
    format!("{entity}#{permission}")
}

fn percent(expected: &[String], uncovered: &[String]) -> u32 {
    if expected.is_empty() {
        return 100;
    }
    ((expected.len() - uncovered.len()) * 100 / expected.len()) as u32
}

fn average(values: impl Iterator<Item = u32>) -> u32 {
    let values: Vec<u32> = values.collect();
    if values.is_empty() {
        return 100;
    }
    values.iter().sum::<u32>() / values.len() as u32
}
