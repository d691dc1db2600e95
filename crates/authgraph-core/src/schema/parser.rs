use pest::Parser as _;
use pest::iterators::Pair;
use pest_derive::Parser;

use super::types::{
    EntityDefinition, PermissionDefinition, RelationDefinition, RelationReference, RewriteNode,
    Schema,
};

#[derive(Parser)]
#[grammar = "schema/grammar.pest"]
struct SchemaDsl;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("permission '{permission}' mixes or/and/not in one expression: group with parentheses")]
    MixedOperators { permission: String },
    #[error("permission '{permission}' chains 'not': exclusion takes exactly one base and one excluded operand")]
    ChainedExclusion { permission: String },
    #[error("duplicate entity: {0}")]
    DuplicateEntity(String),
    #[error("duplicate relation '{relation}' in entity '{entity}'")]
    DuplicateRelation { entity: String, relation: String },
    #[error("duplicate permission '{permission}' in entity '{entity}'")]
    DuplicatePermission { entity: String, permission: String },
}

fn syntax(message: impl Into<String>) -> ParseError {
    ParseError::Syntax(message.into())
}

/// Parses the schema language into its structured form:
///
/// ```text
/// entity repository {
///     relation parent @organization
///     relation owner  @user @organization#admin
///     permission edit = owner or parent.admin
/// }
/// ```
///
/// `action` is accepted as a synonym for `permission`. Expressions combine
/// terms with `or`, `and`, or `not` (binary exclusion); one expression uses
/// one operator kind, sub-expressions are parenthesized.
pub fn parse_schema(input: &str) -> Result<Schema, ParseError> {
    let mut pairs =
        SchemaDsl::parse(Rule::schema, input).map_err(|e| ParseError::Syntax(e.to_string()))?;
    let root = pairs.next().ok_or_else(|| syntax("empty parse result"))?;

    let mut entities: Vec<EntityDefinition> = Vec::new();
    for block in root
        .into_inner()
        .filter(|p| p.as_rule() == Rule::entity_block)
    {
        let entity = entity_from(block)?;
        if entities.iter().any(|e| e.name == entity.name) {
            return Err(ParseError::DuplicateEntity(entity.name));
        }
        entities.push(entity);
    }

    Ok(Schema { entities })
}

fn ident_text(pair: Option<Pair<'_, Rule>>, what: &str) -> Result<String, ParseError> {
    match pair {
        Some(p) => Ok(p.as_str().to_string()),
        None => Err(syntax(format!("expected {what}"))),
    }
}

fn entity_from(block: Pair<'_, Rule>) -> Result<EntityDefinition, ParseError> {
    let mut parts = block.into_inner();
    let mut entity = EntityDefinition {
        name: ident_text(parts.next(), "entity name")?,
        relations: Vec::new(),
        permissions: Vec::new(),
    };

    for stmt in parts {
        match stmt.as_rule() {
            Rule::relation_stmt => {
                let relation = relation_from(stmt)?;
                if entity.get_relation(&relation.name).is_some() {
                    return Err(ParseError::DuplicateRelation {
                        entity: entity.name,
                        relation: relation.name,
                    });
                }
                entity.relations.push(relation);
            }
            Rule::permission_stmt => {
                let permission = permission_from(stmt)?;
                if entity.get_permission(&permission.name).is_some() {
                    return Err(ParseError::DuplicatePermission {
                        entity: entity.name,
                        permission: permission.name,
                    });
                }
                entity.permissions.push(permission);
            }
            _ => {}
        }
    }

    Ok(entity)
}

fn relation_from(stmt: Pair<'_, Rule>) -> Result<RelationDefinition, ParseError> {
    let mut parts = stmt.into_inner();
    let name = ident_text(parts.next(), "relation name")?;

    let mut references = Vec::new();
    for target in parts {
        let mut inner = target.into_inner();
        references.push(RelationReference {
            type_name: ident_text(inner.next(), "relation target type")?,
            relation: inner.next().map(|p| p.as_str().to_string()),
        });
    }

    Ok(RelationDefinition { name, references })
}

fn permission_from(stmt: Pair<'_, Rule>) -> Result<PermissionDefinition, ParseError> {
    let mut parts = stmt.into_inner();
    let name = ident_text(parts.next(), "permission name")?;
    let expr = parts
        .next()
        .ok_or_else(|| syntax("expected permission expression"))?;
    let rule = expression_from(expr, &name)?;

    Ok(PermissionDefinition { name, rule })
}

fn expression_from(expr: Pair<'_, Rule>, permission: &str) -> Result<RewriteNode, ParseError> {
    let mut parts = expr.into_inner();
    let first = term_from(
        parts.next().ok_or_else(|| syntax("empty expression"))?,
        permission,
    )?;

    let mut operator: Option<Rule> = None;
    let mut rest: Vec<RewriteNode> = Vec::new();
    while let Some(op) = parts.next() {
        match operator {
            None => operator = Some(op.as_rule()),
            Some(prev) if prev != op.as_rule() => {
                return Err(ParseError::MixedOperators {
                    permission: permission.to_string(),
                });
            }
            Some(_) => {}
        }
        let term = parts
            .next()
            .ok_or_else(|| syntax("operator without right-hand operand"))?;
        rest.push(term_from(term, permission)?);
    }

    match operator {
        None => Ok(first),
        Some(Rule::or_op) => {
            let mut operands = vec![first];
            operands.extend(rest);
            Ok(RewriteNode::Union(operands))
        }
        Some(Rule::and_op) => {
            let mut operands = vec![first];
            operands.extend(rest);
            Ok(RewriteNode::Intersection(operands))
        }
        Some(Rule::not_op) => {
            let mut operands = rest.into_iter();
            match (operands.next(), operands.next()) {
                (Some(excluded), None) => Ok(RewriteNode::Exclusion(
                    Box::new(first),
                    Box::new(excluded),
                )),
                _ => Err(ParseError::ChainedExclusion {
                    permission: permission.to_string(),
                }),
            }
        }
        Some(other) => Err(syntax(format!("unexpected operator {other:?}"))),
    }
}

fn term_from(term: Pair<'_, Rule>, permission: &str) -> Result<RewriteNode, ParseError> {
    let inner = term
        .into_inner()
        .next()
        .ok_or_else(|| syntax("empty term"))?;
    match inner.as_rule() {
        Rule::userset => {
            let mut parts = inner.into_inner();
            Ok(RewriteNode::TupleToUserset {
                tupleset: ident_text(parts.next(), "userset relation")?,
                computed: ident_text(parts.next(), "userset target relation")?,
            })
        }
        Rule::group => {
            let expr = inner
                .into_inner()
                .next()
                .ok_or_else(|| syntax("empty parenthesized expression"))?;
            expression_from(expr, permission)
        }
        Rule::ident => Ok(RewriteNode::ComputedUserset(inner.as_str().to_string())),
        other => Err(syntax(format!("unexpected term {other:?}"))),
    }
}
