use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use authgraph_core::{SchemaGraphBuilder, parse_schema, validate_references};

use crate::backend::PlaygroundBackend;
use crate::error::PlaygroundError;
use crate::requests::{
    check_request, read_schema_request, write_relationship_request, write_schema_request,
};
use crate::scenario::{Scenario, ScenarioError};
use crate::tuple::{ObjectRef, RelationshipTuple, SubjectRef};

/// The host-embedding container: marshals JSON in and out and delegates to
/// the backend collaborators.
pub struct Development<B> {
    backend: B,
}

/// Result of the graph entry point. On failure `graph` and `schema` are null
/// and `error` carries a display message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphResult {
    pub graph: Option<Value>,
    pub schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<B: PlaygroundBackend> Development<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Runs a full test scenario. Returns the list of validation errors; an
    /// empty list means the scenario passed. A payload that does not
    /// unmarshal is itself reported as a single error.
    pub fn run(&self, payload: &str) -> Vec<ScenarioError> {
        let scenario: Scenario = match serde_json::from_str(payload) {
            Ok(scenario) => scenario,
            Err(e) => return vec![ScenarioError::scenario(e.to_string())],
        };
        debug!(
            relationships = scenario.relationships.len(),
            assertions = scenario.assertions.len(),
            "running scenario"
        );

        // Nothing downstream can succeed without a loaded schema, so schema
        // failures short-circuit.
        let schema = match parse_schema(&scenario.schema) {
            Ok(schema) => schema,
            Err(e) => return vec![ScenarioError::schema(e.to_string())],
        };
        if let Err(errors) = validate_references(&schema) {
            return errors
                .into_iter()
                .map(|e| ScenarioError::schema(e.to_string()))
                .collect();
        }
        if let Err(e) = self
            .backend
            .write_schema(&write_schema_request(scenario.schema.clone()))
        {
            return vec![ScenarioError::schema(e.to_string())];
        }

        let mut errors = Vec::new();

        for raw in &scenario.relationships {
            match raw.parse::<RelationshipTuple>() {
                Err(e) => errors.push(ScenarioError::relationship(raw, e.to_string())),
                Ok(tuple) => {
                    if let Err(e) = self
                        .backend
                        .write_relationship(&write_relationship_request(tuple))
                    {
                        errors.push(ScenarioError::relationship(raw, e.to_string()));
                    }
                }
            }
        }

        for assertion in &scenario.assertions {
            let entity = match assertion.entity.parse::<ObjectRef>() {
                Ok(entity) => entity,
                Err(e) => {
                    errors.push(ScenarioError::assertion(&assertion.entity, e.to_string()));
                    continue;
                }
            };
            let subject = match assertion.subject.parse::<SubjectRef>() {
                Ok(subject) => subject,
                Err(e) => {
                    errors.push(ScenarioError::assertion(&assertion.subject, e.to_string()));
                    continue;
                }
            };
            for (permission, expected) in &assertion.assert {
                let key = format!("{} {} {}", assertion.subject, permission, assertion.entity);
                let request = check_request(entity.clone(), permission.as_str(), subject.clone());
                match self.backend.check(&request) {
                    Err(e) => errors.push(ScenarioError::assertion(&key, e.to_string())),
                    Ok(actual) if actual != *expected => {
                        errors.push(ScenarioError::assertion(
                            &key,
                            format!("expected {expected}, got {actual}"),
                        ));
                    }
                    Ok(_) => {}
                }
            }
        }

        errors
    }

    /// Reads the currently loaded schema, compiles it to a graph, and returns
    /// both as JSON. Any failure short-circuits with a null graph and schema.
    pub fn graph(&self) -> GraphResult {
        match self.build_graph() {
            Ok((graph, schema)) => GraphResult {
                graph: Some(graph),
                schema: Some(schema),
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "graph build failed");
                GraphResult {
                    graph: None,
                    schema: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn build_graph(&self) -> Result<(Value, Value), PlaygroundError> {
        let text = self
            .backend
            .read_schema(&read_schema_request())?
            .ok_or(PlaygroundError::SchemaNotFound)?;
        let schema = parse_schema(&text)?;
        let graph = SchemaGraphBuilder::new(&schema).build()?;
        let graph_json = serde_json::to_value(graph.snapshot())?;
        let schema_json = serde_json::to_value(&schema)?;
        Ok((graph_json, schema_json))
    }
}
