//! Request-shaping helpers: pure data assembly with the playground's fixed
//! defaults (single tenant, bounded traversal depth, one page size). No
//! decision logic belongs here.

use crate::tuple::{ObjectRef, RelationshipTuple, SubjectRef};

pub const DEFAULT_TENANT: &str = "t1";
pub const DEFAULT_MAX_DEPTH: usize = 20;
pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRequest {
    pub tenant_id: String,
    pub entity: ObjectRef,
    pub permission: String,
    pub subject: SubjectRef,
    pub max_depth: usize,
}

pub fn check_request(
    entity: ObjectRef,
    permission: impl Into<String>,
    subject: SubjectRef,
) -> CheckRequest {
    CheckRequest {
        tenant_id: DEFAULT_TENANT.to_string(),
        entity,
        permission: permission.into(),
        subject,
        max_depth: DEFAULT_MAX_DEPTH,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupEntityRequest {
    pub tenant_id: String,
    pub entity_type: String,
    pub permission: String,
    pub subject: SubjectRef,
    pub page_size: usize,
}

pub fn lookup_entity_request(
    entity_type: impl Into<String>,
    permission: impl Into<String>,
    subject: SubjectRef,
) -> LookupEntityRequest {
    LookupEntityRequest {
        tenant_id: DEFAULT_TENANT.to_string(),
        entity_type: entity_type.into(),
        permission: permission.into(),
        subject,
        page_size: DEFAULT_PAGE_SIZE,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRelationshipsRequest {
    pub tenant_id: String,
    pub entity_type: Option<String>,
    pub relation: Option<String>,
    pub page_size: usize,
}

pub fn read_relationships_request(
    entity_type: Option<String>,
    relation: Option<String>,
) -> ReadRelationshipsRequest {
    ReadRelationshipsRequest {
        tenant_id: DEFAULT_TENANT.to_string(),
        entity_type,
        relation,
        page_size: DEFAULT_PAGE_SIZE,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRelationshipRequest {
    pub tenant_id: String,
    pub tuple: RelationshipTuple,
}

pub fn write_relationship_request(tuple: RelationshipTuple) -> WriteRelationshipRequest {
    WriteRelationshipRequest {
        tenant_id: DEFAULT_TENANT.to_string(),
        tuple,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadSchemaRequest {
    pub tenant_id: String,
}

pub fn read_schema_request() -> ReadSchemaRequest {
    ReadSchemaRequest {
        tenant_id: DEFAULT_TENANT.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSchemaRequest {
    pub tenant_id: String,
    pub schema: String,
}

pub fn write_schema_request(schema: impl Into<String>) -> WriteSchemaRequest {
    WriteSchemaRequest {
        tenant_id: DEFAULT_TENANT.to_string(),
        schema: schema.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_request_applies_defaults() {
        let request = check_request(
            ObjectRef::new("document", "1"),
            "edit",
            SubjectRef::direct("user", "ada"),
        );

        assert_eq!(request.tenant_id, DEFAULT_TENANT);
        assert_eq!(request.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(request.permission, "edit");
    }

    #[test]
    fn read_relationships_request_applies_defaults() {
        let request = read_relationships_request(Some("document".to_string()), None);

        assert_eq!(request.tenant_id, DEFAULT_TENANT);
        assert_eq!(request.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(request.entity_type.as_deref(), Some("document"));
        assert_eq!(request.relation, None);
    }

    #[test]
    fn lookup_request_applies_page_size() {
        let request = lookup_entity_request("document", "view", SubjectRef::direct("user", "ada"));

        assert_eq!(request.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn schema_requests_target_default_tenant() {
        assert_eq!(read_schema_request().tenant_id, DEFAULT_TENANT);
        assert_eq!(write_schema_request("entity user {}").tenant_id, DEFAULT_TENANT);
    }
}
