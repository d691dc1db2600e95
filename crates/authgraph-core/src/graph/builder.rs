use std::collections::HashSet;

use crate::schema::types::{EntityDefinition, RelationReference, RewriteNode, Schema};

use super::{Graph, Node};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("relation '{relation}' not found on entity '{entity}'")]
    RelationNotFound { entity: String, relation: String },

    #[error("cyclic relation reference through '{entity}#{relation}'")]
    CyclicReference { entity: String, relation: String },
}

/// Entity- or schema-level wrapper around a [`BuildError`], preserving the
/// original cause. A build either produces the whole graph or nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to build graph for entity '{entity}': {source}")]
pub struct GraphBuildError {
    pub entity: String,
    #[source]
    pub source: BuildError,
}

/// Compiles a schema into a graph of typed nodes and edges. Deterministic for
/// a fixed schema, except for operation-node ids, which only need to be
/// pairwise distinct within one build.
pub struct SchemaGraphBuilder<'a> {
    schema: &'a Schema,
}

impl<'a> SchemaGraphBuilder<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    pub fn build(&self) -> Result<Graph, GraphBuildError> {
        let g = Graph::new();
        for entity in &self.schema.entities {
            let eg = self
                .entity_to_graph(entity)
                .map_err(|source| GraphBuildError {
                    entity: entity.name.clone(),
                    source,
                })?;
            g.merge(eg);
        }
        Ok(g)
    }

    pub fn entity_to_graph(&self, entity: &EntityDefinition) -> Result<Graph, BuildError> {
        let g = Graph::new();
        let entity_node = Node::entity(&entity.name);
        g.add_node(entity_node.clone());

        for relation in &entity.relations {
            let relation_node = Node::relation(&entity.name, &relation.name);
            for reference in &relation.references {
                let target =
                    self.reference_target(&g, &reference.type_name, reference.relation.as_deref());
                g.add_edge(relation_node.clone(), target, None);
            }
            g.add_node(relation_node.clone());
            g.add_edge(entity_node.clone(), relation_node, None);
        }

        for permission in &entity.permissions {
            let permission_node = Node::permission(&entity.name, &permission.name);
            g.add_node(permission_node.clone());
            g.add_edge(entity_node.clone(), permission_node.clone(), None);
            let pg = self.permission_graph(entity, &permission_node, &[&permission.rule])?;
            g.merge(pg);
        }

        Ok(g)
    }

    /// Walks a list of rewrite-tree children, accumulating one sub-graph.
    /// Operation variants become visible intermediate nodes; leaves become
    /// direct edges to relation nodes.
    fn permission_graph(
        &self,
        entity: &EntityDefinition,
        from: &Node,
        children: &[&RewriteNode],
    ) -> Result<Graph, BuildError> {
        let g = Graph::new();
        for child in children {
            match child {
                RewriteNode::Union(nodes) => {
                    let refs: Vec<&RewriteNode> = nodes.iter().collect();
                    self.operation_graph(&g, entity, from, "union", &refs)?;
                }
                RewriteNode::Intersection(nodes) => {
                    let refs: Vec<&RewriteNode> = nodes.iter().collect();
                    self.operation_graph(&g, entity, from, "intersection", &refs)?;
                }
                RewriteNode::Exclusion(base, excluded) => {
                    self.operation_graph(
                        &g,
                        entity,
                        from,
                        "exclusion",
                        &[base.as_ref(), excluded.as_ref()],
                    )?;
                }
                RewriteNode::ComputedUserset(relation) => {
                    let target = self.reference_target(&g, &entity.name, Some(relation));
                    g.add_edge(from.clone(), target, None);
                }
                RewriteNode::TupleToUserset { tupleset, computed } => {
                    let relation =
                        entity
                            .get_relation(tupleset)
                            .ok_or_else(|| BuildError::RelationNotFound {
                                entity: entity.name.clone(),
                                relation: tupleset.clone(),
                            })?;
                    for reference in &relation.references {
                        let mut seen = HashSet::new();
                        let rg =
                            self.resolve_tupleset_reference(from, reference, computed, &mut seen)?;
                        g.merge(rg);
                    }
                }
            }
        }
        Ok(g)
    }

    fn operation_graph(
        &self,
        g: &Graph,
        entity: &EntityDefinition,
        from: &Node,
        label: &str,
        children: &[&RewriteNode],
    ) -> Result<(), BuildError> {
        let op = Node::operation(label);
        g.add_node(op.clone());
        g.add_edge(from.clone(), op.clone(), None);
        g.merge(self.permission_graph(entity, &op, children)?);
        Ok(())
    }

    /// Resolves one reference of a tuple-set relation to its terminal
    /// relation node, chasing relation-to-relation indirection. The chase
    /// stops at the last relation-valued hop: the computed relation applies
    /// to that userset's own entity type. Self-loops (`group#member` inside
    /// `group.member`) cannot make progress and count as terminal; longer
    /// cyclic chains are reported via a `seen` set keyed by
    /// `(entity, relation)` instead of recursing without bound. `seen` holds
    /// the hops of the active path only: sibling branches may legitimately
    /// converge on the same terminal userset, so each hop is released when
    /// its branch returns.
    fn resolve_tupleset_reference(
        &self,
        from: &Node,
        reference: &RelationReference,
        computed: &str,
        seen: &mut HashSet<(String, String)>,
    ) -> Result<Graph, BuildError> {
        let g = Graph::new();
        match &reference.relation {
            None => {
                let target = self.reference_target(&g, &reference.type_name, Some(computed));
                g.add_edge(from.clone(), target, None);
            }
            Some(relation_name) => {
                let hop = (reference.type_name.clone(), relation_name.clone());
                if !seen.insert(hop.clone()) {
                    return Err(BuildError::CyclicReference {
                        entity: reference.type_name.clone(),
                        relation: relation_name.clone(),
                    });
                }
                let entity = self
                    .schema
                    .get_entity(&reference.type_name)
                    .ok_or_else(|| BuildError::EntityNotFound(reference.type_name.clone()))?;
                let relation = entity.get_relation(relation_name).ok_or_else(|| {
                    BuildError::RelationNotFound {
                        entity: entity.name.clone(),
                        relation: relation_name.clone(),
                    }
                })?;

                let chained: Vec<&RelationReference> = relation
                    .references
                    .iter()
                    .filter(|r| r.relation.is_some())
                    .filter(|r| {
                        !(r.type_name == reference.type_name
                            && r.relation.as_deref() == Some(relation_name.as_str()))
                    })
                    .collect();
                if chained.is_empty() {
                    let target = self.reference_target(&g, &reference.type_name, Some(computed));
                    g.add_edge(from.clone(), target, None);
                } else {
                    for r in chained {
                        g.merge(self.resolve_tupleset_reference(from, r, computed, seen)?);
                    }
                }
                seen.remove(&hop);
            }
        }
        Ok(g)
    }

    /// Builds the node an edge points at. Targets backed by a definition are
    /// emitted by the owning entity's own pass; targets pointing outside the
    /// schema are added here so every edge endpoint exists in the node list.
    fn reference_target(&self, g: &Graph, type_name: &str, relation: Option<&str>) -> Node {
        match relation {
            None => {
                let node = Node::entity(type_name);
                if self.schema.get_entity(type_name).is_none() {
                    g.add_node(node.clone());
                }
                node
            }
            Some(relation_name) => {
                let node = Node::relation(type_name, relation_name);
                let rooted = self.schema.get_entity(type_name).is_some_and(|e| {
                    e.get_relation(relation_name).is_some()
                        || e.get_permission(relation_name).is_some()
                });
                if !rooted {
                    g.add_node(node.clone());
                }
                node
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;
    use crate::graph::NodeType;
    use crate::schema::parse_schema;

    fn build(input: &str) -> Graph {
        let schema = parse_schema(input).unwrap();
        SchemaGraphBuilder::new(&schema).build().unwrap()
    }

    fn build_err(input: &str) -> GraphBuildError {
        let schema = parse_schema(input).unwrap();
        SchemaGraphBuilder::new(&schema).build().unwrap_err()
    }

    fn edge_ids(g: &Graph) -> Vec<(String, String)> {
        g.edges()
            .into_iter()
            .map(|e| (e.from.id, e.to.id))
            .collect()
    }

    #[test]
    fn end_to_end_document_example() {
        let g = build(
            r#"
            entity user {}
            entity document {
                relation owner @user
                permission edit = owner
            }
            "#,
        );

        let node_set: HashSet<(NodeType, String)> = g
            .nodes()
            .into_iter()
            .map(|n| (n.node_type, n.id))
            .collect();
        let expected: HashSet<(NodeType, String)> = [
            (NodeType::Entity, "document".to_string()),
            (NodeType::Relation, "document#owner".to_string()),
            (NodeType::Entity, "user".to_string()),
            (NodeType::Permission, "document#edit".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(node_set, expected);

        let edges: HashSet<(String, String)> = edge_ids(&g).into_iter().collect();
        let expected_edges: HashSet<(String, String)> = [
            ("document".to_string(), "document#owner".to_string()),
            ("document#owner".to_string(), "user".to_string()),
            ("document".to_string(), "document#edit".to_string()),
            ("document#edit".to_string(), "document#owner".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(edges, expected_edges);
    }

    #[test]
    fn builds_are_deterministic_modulo_operation_ids() {
        let input = r#"
            entity user {}
            entity group { relation member @user @group#member }
            entity document {
                relation owner @user
                relation viewer @user @group#member
                relation banned @user
                permission view = owner or viewer
                permission audit = owner and viewer
                permission strict = viewer not banned
            }
        "#;

        let a = build(input);
        let b = build(input);

        let key = |g: &Graph| -> HashSet<(NodeType, String)> {
            g.nodes()
                .into_iter()
                .filter(|n| n.node_type != NodeType::Operation)
                .map(|n| (n.node_type, n.id))
                .collect()
        };
        assert_eq!(key(&a), key(&b));

        // Edge multisets compared on labels since operation ids differ.
        let edge_labels = |g: &Graph| -> HashMap<(String, String), usize> {
            let mut counts = HashMap::new();
            for e in g.edges() {
                *counts
                    .entry((e.from.label.clone(), e.to.label.clone()))
                    .or_insert(0) += 1;
            }
            counts
        };
        assert_eq!(edge_labels(&a), edge_labels(&b));
    }

    #[test]
    fn every_edge_endpoint_is_a_node() {
        let g = build(
            r#"
            entity user {}
            entity group { relation member @user @group#member }
            entity folder {
                relation viewer @user
            }
            entity document {
                relation parent @folder
                relation owner @user
                relation team @group#member
                permission view = owner or parent.viewer or team.member
                permission audit = owner and view
            }
            "#,
        );

        let ids: HashSet<String> = g.nodes().into_iter().map(|n| n.id).collect();
        for (from, to) in edge_ids(&g) {
            assert!(ids.contains(&from), "missing node for edge source {from}");
            assert!(ids.contains(&to), "missing node for edge target {to}");
        }
    }

    #[test]
    fn entity_node_count_matches_definitions() {
        let g = build(
            r#"
            entity user {}
            entity group { relation member @user }
            entity document { relation owner @user relation team @group#member }
            "#,
        );

        let entity_nodes = g
            .nodes()
            .into_iter()
            .filter(|n| n.node_type == NodeType::Entity)
            .count();
        assert_eq!(entity_nodes, 3);
    }

    #[test]
    fn relation_fan_out_is_one_edge_per_reference() {
        let g = build(
            r#"
            entity user {}
            entity bot {}
            entity group { relation member @user }
            entity document { relation viewer @user @bot @group#member }
            "#,
        );

        let from_viewer = edge_ids(&g)
            .into_iter()
            .filter(|(from, _)| from == "document#viewer")
            .count();
        assert_eq!(from_viewer, 3);
    }

    #[test]
    fn single_leaf_permission_yields_one_edge_and_no_operations() {
        let g = build(
            r#"
            entity user {}
            entity document {
                relation owner @user
                permission edit = owner
            }
            "#,
        );

        assert!(
            g.nodes()
                .iter()
                .all(|n| n.node_type != NodeType::Operation)
        );
        let from_permission = edge_ids(&g)
            .into_iter()
            .filter(|(from, _)| from == "document#edit")
            .count();
        assert_eq!(from_permission, 1);
    }

    #[test]
    fn union_becomes_an_operation_node() {
        let g = build(
            r#"
            entity user {}
            entity document {
                relation owner @user
                relation editor @user
                permission edit = owner or editor
            }
            "#,
        );

        let ops: Vec<_> = g
            .nodes()
            .into_iter()
            .filter(|n| n.node_type == NodeType::Operation)
            .collect();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].label, "union");

        // permission -> operation -> each leaf relation
        let edges = edge_ids(&g);
        let op_id = &ops[0].id;
        assert!(edges.contains(&("document#edit".to_string(), op_id.clone())));
        assert!(edges.contains(&(op_id.clone(), "document#owner".to_string())));
        assert!(edges.contains(&(op_id.clone(), "document#editor".to_string())));
    }

    #[test]
    fn exclusion_becomes_an_operation_node_with_two_branches() {
        let g = build(
            r#"
            entity user {}
            entity document {
                relation viewer @user
                relation banned @user
                permission view = viewer not banned
            }
            "#,
        );

        let ops: Vec<_> = g
            .nodes()
            .into_iter()
            .filter(|n| n.node_type == NodeType::Operation)
            .collect();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].label, "exclusion");

        let outgoing = edge_ids(&g)
            .into_iter()
            .filter(|(from, _)| from == &ops[0].id)
            .count();
        assert_eq!(outgoing, 2);
    }

    #[test]
    fn repeated_leaf_produces_repeated_edges() {
        let g = build(
            r#"
            entity user {}
            entity document {
                relation owner @user
                relation banned @user
                permission odd = owner not banned
                permission view = owner or odd
            }
            "#,
        );

        // owner appears as a leaf under both permissions; multiplicity is kept.
        let to_owner = edge_ids(&g)
            .into_iter()
            .filter(|(_, to)| to == "document#owner")
            .count();
        assert_eq!(to_owner, 3); // entity->relation edge target excluded below
        let to_owner_from_leaves = edge_ids(&g)
            .into_iter()
            .filter(|(from, to)| to == "document#owner" && from != "document")
            .count();
        assert_eq!(to_owner_from_leaves, 2);
    }

    #[test]
    fn tupleset_expands_every_reference() {
        let g = build(
            r#"
            entity user {}
            entity team { relation lead @user }
            entity org { relation lead @user }
            entity document {
                relation parent @team @org
                permission approve = parent.lead
            }
            "#,
        );

        let edges: Vec<_> = edge_ids(&g)
            .into_iter()
            .filter(|(from, _)| from == "document#approve")
            .collect();
        assert_eq!(edges.len(), 2);
        let targets: HashSet<String> = edges.into_iter().map(|(_, to)| to).collect();
        assert_eq!(
            targets,
            HashSet::from(["team#lead".to_string(), "org#lead".to_string()])
        );
    }

    #[test]
    fn indirection_terminates_at_last_userset_hop() {
        let g = build(
            r#"
            entity c {}
            entity b { relation member @c }
            entity a {
                relation viewer @b#member
                permission read = viewer.member
            }
            "#,
        );

        let from_permission: Vec<_> = edge_ids(&g)
            .into_iter()
            .filter(|(from, _)| from == "a#read")
            .collect();
        assert_eq!(from_permission.len(), 1);
        assert_eq!(from_permission[0].1, "b#member");
    }

    #[test]
    fn two_level_indirection_chases_to_the_final_userset() {
        let g = build(
            r#"
            entity user {}
            entity c { relation member @user }
            entity b { relation member @c#member }
            entity a {
                relation viewer @b#member
                permission read = viewer.member
            }
            "#,
        );

        let from_permission: Vec<_> = edge_ids(&g)
            .into_iter()
            .filter(|(from, _)| from == "a#read")
            .collect();
        assert_eq!(from_permission.len(), 1);
        assert_eq!(from_permission[0].1, "c#member");
    }

    #[test]
    fn self_referential_group_chase_terminates_at_the_group_userset() {
        let g = build(
            r#"
            entity user {}
            entity group { relation member @user @group#member }
            entity document {
                relation team @group#member
                permission view = team.member
            }
            "#,
        );

        let from_permission: Vec<_> = edge_ids(&g)
            .into_iter()
            .filter(|(from, _)| from == "document#view")
            .collect();
        assert_eq!(from_permission.len(), 1);
        assert_eq!(from_permission[0].1, "group#member");
    }

    #[test]
    fn tupleset_with_no_references_is_a_silent_no_op() {
        let mut schema = parse_schema(
            r#"
            entity document {
                relation parent @ghost
                permission view = parent.viewer
            }
            "#,
        )
        .unwrap();
        // Force an empty reference list on the tupleset relation.
        schema.entities[0].relations[0].references.clear();

        let g = SchemaGraphBuilder::new(&schema).build().unwrap();

        let from_permission = edge_ids(&g)
            .into_iter()
            .filter(|(from, _)| from == "document#view")
            .count();
        assert_eq!(from_permission, 0);
    }

    #[test]
    fn empty_entity_yields_single_node_and_no_edges() {
        let g = build("entity user {}");

        let nodes = g.nodes();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].node_type, NodeType::Entity);
        assert_eq!(nodes[0].id, "user");
        assert!(g.edges().is_empty());
    }

    #[test]
    fn missing_tupleset_relation_fails_with_relation_not_found() {
        let err = build_err(
            r#"
            entity user {}
            entity document {
                permission view = parent.viewer
            }
            "#,
        );

        assert_eq!(err.entity, "document");
        assert_eq!(
            err.source,
            BuildError::RelationNotFound {
                entity: "document".to_string(),
                relation: "parent".to_string(),
            }
        );
    }

    #[test]
    fn missing_referenced_entity_fails_with_entity_not_found() {
        let err = build_err(
            r#"
            entity document {
                relation parent @ghost#member
                permission view = parent.viewer
            }
            "#,
        );

        assert_eq!(err.source, BuildError::EntityNotFound("ghost".to_string()));
    }

    #[test]
    fn cyclic_reference_chain_is_reported() {
        let err = build_err(
            r#"
            entity a {
                relation viewer @b#through
                permission read = viewer.member
            }
            entity b { relation through @a#viewer }
            "#,
        );

        assert!(matches!(err.source, BuildError::CyclicReference { .. }));
    }

    #[test]
    fn failure_returns_no_partial_graph() {
        let schema = parse_schema(
            r#"
            entity user {}
            entity document {
                permission view = parent.viewer
            }
            "#,
        )
        .unwrap();

        let result = SchemaGraphBuilder::new(&schema).build();

        assert!(result.is_err());
    }

    #[test]
    fn dangling_reference_target_is_emitted_inline() {
        // "ghost" is never defined, so its node must come from the edge site.
        let g = build("entity document { relation owner @ghost }");

        let ids: HashSet<String> = g.nodes().into_iter().map(|n| n.id).collect();
        assert!(ids.contains("ghost"));
    }

    #[test]
    fn diamond_indirection_resolves_both_branches() {
        // Two chains converge on the same terminal userset; that is a DAG,
        // not a cycle, and must yield one edge per branch.
        let g = build(
            r#"
            entity user {}
            entity e { relation z @user }
            entity c { relation x @e#z }
            entity d { relation y @e#z }
            entity b { relation through @c#x @d#y }
            entity a {
                relation link @b#through
                permission go = link.z
            }
            "#,
        );

        let from_permission: Vec<_> = edge_ids(&g)
            .into_iter()
            .filter(|(from, _)| from == "a#go")
            .collect();
        assert_eq!(from_permission.len(), 2);
        assert!(from_permission.iter().all(|(_, to)| to == "e#z"));
    }

    #[test]
    fn build_error_message_names_entity_and_cause() {
        let err = build_err(
            r#"
            entity user {}
            entity document {
                permission view = parent.viewer
            }
            "#,
        );

        let message = err.to_string();
        assert!(message.contains("document"), "got: {message}");
        assert!(message.contains("parent"), "got: {message}");
    }

    #[test]
    fn parenthesized_sub_expression_chains_operation_nodes() {
        let g = build(
            r#"
            entity user {}
            entity repository {
                relation owner @user
                relation viewer @user
                relation banned @user
                permission read = owner or (viewer not banned)
            }
            "#,
        );

        let ops: HashMap<String, String> = g
            .nodes()
            .into_iter()
            .filter(|n| n.node_type == NodeType::Operation)
            .map(|n| (n.id, n.label))
            .collect();
        assert_eq!(ops.len(), 2);
        let labels: HashSet<&str> = ops.values().map(String::as_str).collect();
        assert_eq!(labels, HashSet::from(["union", "exclusion"]));

        // The union operation feeds the nested exclusion operation.
        let edges = edge_ids(&g);
        assert!(edges.iter().any(|(from, to)| {
            ops.get(from).map(String::as_str) == Some("union")
                && ops.get(to).map(String::as_str) == Some("exclusion")
        }));
    }
}
