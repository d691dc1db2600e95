use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub entities: Vec<EntityDefinition>,
}

impl Schema {
    pub fn get_entity(&self, name: &str) -> Option<&EntityDefinition> {
        self.entities.iter().find(|e| e.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityDefinition {
    pub name: String,
    pub relations: Vec<RelationDefinition>,
    pub permissions: Vec<PermissionDefinition>,
}

impl EntityDefinition {
    pub fn get_relation(&self, name: &str) -> Option<&RelationDefinition> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn get_permission(&self, name: &str) -> Option<&PermissionDefinition> {
        self.permissions.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationDefinition {
    pub name: String,
    pub references: Vec<RelationReference>,
}

/// A type a relation may point at. `relation: Some(_)` means the reference
/// targets a userset (a relation on the referenced entity type) rather than
/// the entity type itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationReference {
    pub type_name: String,
    pub relation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionDefinition {
    pub name: String,
    pub rule: RewriteNode,
}

/// Rewrite tree of a permission: boolean combinations over relation leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteNode {
    ComputedUserset(String),
    TupleToUserset { tupleset: String, computed: String },
    Union(Vec<RewriteNode>),
    Intersection(Vec<RewriteNode>),
    Exclusion(Box<RewriteNode>, Box<RewriteNode>),
}
