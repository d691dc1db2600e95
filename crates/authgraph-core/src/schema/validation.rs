use super::types::{EntityDefinition, RewriteNode, Schema};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("relation '{entity}#{relation}' references undefined entity '{referenced}'")]
    UndefinedEntity {
        entity: String,
        relation: String,
        referenced: String,
    },
    #[error(
        "relation '{entity}#{relation}' references undefined relation '{referenced_entity}#{referenced_relation}'"
    )]
    UndefinedRelation {
        entity: String,
        relation: String,
        referenced_entity: String,
        referenced_relation: String,
    },
    #[error("permission '{entity}#{permission}' references unknown name '{name}'")]
    UnknownRuleTarget {
        entity: String,
        permission: String,
        name: String,
    },
    #[error("permission '{entity}#{permission}' uses undefined tupleset relation '{tupleset}'")]
    UnknownTupleset {
        entity: String,
        permission: String,
        tupleset: String,
    },
}

/// Checks that every relation reference and every permission rule resolves to
/// a name defined somewhere in the schema. Collects all failures instead of
/// stopping at the first so a playground user sees the full picture at once.
pub fn validate_references(schema: &Schema) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for entity in &schema.entities {
        for relation in &entity.relations {
            for reference in &relation.references {
                match schema.get_entity(&reference.type_name) {
                    None => {
                        errors.push(ValidationError::UndefinedEntity {
                            entity: entity.name.clone(),
                            relation: relation.name.clone(),
                            referenced: reference.type_name.clone(),
                        });
                    }
                    Some(target) => {
                        if let Some(ref target_relation) = reference.relation {
                            if target.get_relation(target_relation).is_none() {
                                errors.push(ValidationError::UndefinedRelation {
                                    entity: entity.name.clone(),
                                    relation: relation.name.clone(),
                                    referenced_entity: reference.type_name.clone(),
                                    referenced_relation: target_relation.clone(),
                                });
                            }
                        }
                    }
                }
            }
        }

        for permission in &entity.permissions {
            validate_rule(entity, &permission.name, &permission.rule, &mut errors);
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn validate_rule(
    entity: &EntityDefinition,
    permission: &str,
    rule: &RewriteNode,
    errors: &mut Vec<ValidationError>,
) {
    match rule {
        RewriteNode::ComputedUserset(name) => {
            // Computed usersets may target a sibling relation or permission.
            if entity.get_relation(name).is_none() && entity.get_permission(name).is_none() {
                errors.push(ValidationError::UnknownRuleTarget {
                    entity: entity.name.clone(),
                    permission: permission.to_string(),
                    name: name.clone(),
                });
            }
        }
        RewriteNode::TupleToUserset { tupleset, .. } => {
            if entity.get_relation(tupleset).is_none() {
                errors.push(ValidationError::UnknownTupleset {
                    entity: entity.name.clone(),
                    permission: permission.to_string(),
                    tupleset: tupleset.clone(),
                });
            }
        }
        RewriteNode::Union(children) | RewriteNode::Intersection(children) => {
            for child in children {
                validate_rule(entity, permission, child, errors);
            }
        }
        RewriteNode::Exclusion(base, excluded) => {
            validate_rule(entity, permission, base, errors);
            validate_rule(entity, permission, excluded, errors);
        }
    }
}
