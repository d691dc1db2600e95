use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A full playground test scenario: a schema, relationship tuples to load,
/// and assertions to evaluate against them.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub schema: String,
    #[serde(default)]
    pub relationships: Vec<String>,
    #[serde(default)]
    pub assertions: Vec<Assertion>,
}

/// Expected check outcomes for one entity/subject pair, keyed by permission.
#[derive(Debug, Clone, Deserialize)]
pub struct Assertion {
    pub entity: String,
    pub subject: String,
    pub assert: BTreeMap<String, bool>,
}

/// One validation failure reported back to the host. An empty error list
/// means the scenario passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub key: String,
    pub message: String,
}

impl ScenarioError {
    pub fn scenario(message: impl Into<String>) -> Self {
        Self {
            error_type: "scenario".to_string(),
            key: String::new(),
            message: message.into(),
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self {
            error_type: "schema".to_string(),
            key: String::new(),
            message: message.into(),
        }
    }

    pub fn relationship(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: "relationships".to_string(),
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn assertion(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: "assertions".to_string(),
            key: key.into(),
            message: message.into(),
        }
    }
}
