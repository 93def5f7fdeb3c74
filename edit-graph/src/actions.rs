use crate::{EntityID, Graph, NodeID, RelationID, WayID};

/// Deletes a node, detaching it from every way and relation that uses it. Ways and relations
/// left degenerate are deleted too.
pub fn delete_node(mut graph: Graph, id: NodeID) -> Graph {
    let parent_ways: Vec<_> = graph
        .parent_ways(id)
        .into_iter()
        .map(|way| way.remove_node(id))
        .collect();
    for way in parent_ways {
        let (way_id, degenerate) = (way.id, way.is_degenerate());
        graph = graph.replace(way);
        if degenerate {
            graph = delete_way(graph, way_id);
        }
    }

    graph = detach_from_relations(graph, id.into());
    graph.remove(id)
}

/// Deletes a way. Its nodes go with it, unless something else still needs them: another way,
/// a relation, or their own tags.
pub fn delete_way(mut graph: Graph, id: WayID) -> Graph {
    let Some(way) = graph.way(id).cloned() else {
        return graph;
    };

    graph = detach_from_relations(graph, id.into());
    graph = graph.remove(id);

    let mut nodes = way.nodes;
    nodes.sort();
    nodes.dedup();
    for node_id in nodes {
        let orphaned = match graph.node(node_id) {
            Some(node) => {
                graph.parent_ways(node_id).is_empty()
                    && graph.parent_relations(node_id).is_empty()
                    && !node.has_interesting_tags()
            }
            None => false,
        };
        if orphaned {
            graph = graph.remove(node_id);
        }
    }
    graph
}

/// Deletes a relation, removing it from any parent relations.
pub fn delete_relation(mut graph: Graph, id: RelationID) -> Graph {
    if graph.relation(id).is_none() {
        return graph;
    }
    graph = detach_from_relations(graph, id.into());
    graph.remove(id)
}

// Relations left without members are deleted. The stripped relation is written back before
// recursing, so cycles between relations terminate.
fn detach_from_relations(mut graph: Graph, member: EntityID) -> Graph {
    let parents: Vec<_> = graph
        .parent_relations(member)
        .into_iter()
        .map(|relation| relation.remove_members_with_id(member))
        .collect();
    for relation in parents {
        let (relation_id, degenerate) = (relation.id, relation.is_degenerate());
        graph = graph.replace(relation);
        if degenerate {
            graph = delete_relation(graph, relation_id);
        }
    }
    graph
}
