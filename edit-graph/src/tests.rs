use geo::coord;

use crate::*;

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// n1 - n2 - n3 - n4 as way w1, plus w2 = n3 - n5 branching off
fn small_graph() -> Graph {
    let mut graph = Graph::new();
    for i in 1..=5 {
        graph = graph.replace(Node::new(NodeID(i), coord! { x: i as f64, y: 0.0 }));
    }
    graph
        .replace(Way::new(
            WayID(1),
            vec![NodeID(1), NodeID(2), NodeID(3), NodeID(4)],
        ))
        .replace(Way::new(WayID(2), vec![NodeID(3), NodeID(5)]))
}

#[test]
fn test_parse_ids() {
    assert_eq!("n12".parse::<EntityID>(), Ok(EntityID::Node(NodeID(12))));
    assert_eq!("w3".parse::<EntityID>(), Ok(EntityID::Way(WayID(3))));
    assert_eq!(
        "r-1".parse::<EntityID>(),
        Ok(EntityID::Relation(RelationID(-1)))
    );
    assert_eq!("".parse::<EntityID>(), Err(ParseIdError::Empty));
    assert_eq!(
        "x1".parse::<EntityID>(),
        Err(ParseIdError::UnknownType("x1".to_string()))
    );
    assert_eq!(
        "nope".parse::<EntityID>(),
        Err(ParseIdError::BadNumber("nope".to_string()))
    );

    for id in ["n5", "w-2", "r7"] {
        assert_eq!(id.parse::<EntityID>().unwrap().to_string(), id);
    }
}

#[test]
fn test_interesting_tags() {
    assert!(!has_interesting_tags(&Tags::new()));
    assert!(!has_interesting_tags(&tags(&[
        ("source", "survey"),
        ("source:geometry", "bing"),
        ("created_by", "JOSM"),
        ("tiger:county", "King"),
    ])));
    assert!(has_interesting_tags(&tags(&[
        ("source", "survey"),
        ("highway", "crossing"),
    ])));
}

#[test]
fn test_snapshots_are_independent() {
    let before = small_graph();
    let copy = before.clone();
    assert!(copy.shares_storage_with(&before));

    let after = copy.replace(Node::new(NodeID(1), coord! { x: 9.0, y: 9.0 }));
    assert_eq!(
        before.node(NodeID(1)).unwrap().loc,
        coord! { x: 1.0, y: 0.0 }
    );
    assert_eq!(
        after.node(NodeID(1)).unwrap().loc,
        coord! { x: 9.0, y: 9.0 }
    );
    assert!(!after.shares_storage_with(&before));
}

#[test]
fn test_parents() {
    let graph = small_graph().replace(Relation::new(
        RelationID(1),
        vec![Member {
            id: NodeID(4).into(),
            role: "stop".to_string(),
        }],
    ));

    let parents: Vec<WayID> = graph.parent_ways(NodeID(3)).iter().map(|w| w.id).collect();
    assert_eq!(parents, vec![WayID(1), WayID(2)]);
    assert_eq!(graph.parent_ways(NodeID(2)).len(), 1);
    assert_eq!(graph.parent_relations(NodeID(4)).len(), 1);
    assert!(graph.parent_relations(NodeID(3)).is_empty());

    assert!(matches!(
        graph.entity(EntityID::Way(WayID(2))),
        Some(EntityRef::Way(_))
    ));
    assert!(graph.entity(EntityID::Node(NodeID(99))).is_none());
}

#[test]
fn test_parents_follow_edits() {
    let graph = small_graph().replace(Relation::new(
        RelationID(1),
        vec![Member {
            id: WayID(2).into(),
            role: String::new(),
        }],
    ));
    assert_eq!(graph.parent_relations(WayID(2)).len(), 1);

    // Reroute w2 to end at n4 instead of n5
    let graph = graph.replace(Way::new(WayID(2), vec![NodeID(3), NodeID(4)]));
    assert!(graph.parent_ways(NodeID(5)).is_empty());
    let parents: Vec<WayID> = graph.parent_ways(NodeID(4)).iter().map(|w| w.id).collect();
    assert_eq!(parents, vec![WayID(1), WayID(2)]);

    // Point the relation at w1 instead
    let graph = graph.replace(Relation::new(
        RelationID(1),
        vec![Member {
            id: WayID(1).into(),
            role: String::new(),
        }],
    ));
    assert!(graph.parent_relations(WayID(2)).is_empty());
    assert_eq!(graph.parent_relations(WayID(1))[0].id, RelationID(1));

    let graph = graph.remove(WayID(1)).remove(RelationID(1));
    assert_eq!(graph.parent_ways(NodeID(1)).len(), 0);
    assert_eq!(graph.parent_ways(NodeID(3)).len(), 1);
    assert!(graph.parent_relations(WayID(1)).is_empty());
    // Nothing stale is left behind
    let expected = small_graph()
        .remove(WayID(1))
        .replace(Way::new(WayID(2), vec![NodeID(3), NodeID(4)]));
    assert_eq!(graph, expected);
}

#[test]
fn test_delete_interior_node() {
    let graph = delete_node(small_graph(), NodeID(2));
    assert!(graph.node(NodeID(2)).is_none());
    assert_eq!(
        graph.way(WayID(1)).unwrap().nodes,
        vec![NodeID(1), NodeID(3), NodeID(4)]
    );
}

#[test]
fn test_delete_node_cascades_to_degenerate_way() {
    // Removing n5 leaves w2 with only n3, so w2 goes away. n3 is still used by w1.
    let graph = delete_node(small_graph(), NodeID(5));
    assert!(graph.way(WayID(2)).is_none());
    assert!(graph.node(NodeID(3)).is_some());
    assert_eq!(graph.way(WayID(1)).unwrap().nodes.len(), 4);
}

#[test]
fn test_delete_way_keeps_needed_nodes() {
    let graph = small_graph().replace(
        Node::new(NodeID(1), coord! { x: 1.0, y: 0.0 }).with_tags(tags(&[("barrier", "gate")])),
    );
    let graph = delete_way(graph, WayID(1));
    assert!(graph.way(WayID(1)).is_none());
    // Tagged
    assert!(graph.node(NodeID(1)).is_some());
    // Plain
    assert!(graph.node(NodeID(2)).is_none());
    assert!(graph.node(NodeID(4)).is_none());
    // Still used by w2
    assert!(graph.node(NodeID(3)).is_some());
}

#[test]
fn test_delete_node_updates_relations() {
    let graph = small_graph()
        .replace(Relation::new(
            RelationID(1),
            vec![Member {
                id: NodeID(2).into(),
                role: String::new(),
            }],
        ))
        .replace(Relation::new(
            RelationID(2),
            vec![
                Member {
                    id: NodeID(2).into(),
                    role: String::new(),
                },
                Member {
                    id: WayID(1).into(),
                    role: String::new(),
                },
            ],
        ));
    let graph = delete_node(graph, NodeID(2));
    // Only member was gone
    assert!(graph.relation(RelationID(1)).is_none());
    assert_eq!(graph.relation(RelationID(2)).unwrap().members.len(), 1);
}

#[test]
fn test_delete_relation_cycle_terminates() {
    let graph = Graph::new()
        .replace(Relation::new(
            RelationID(1),
            vec![Member {
                id: RelationID(2).into(),
                role: String::new(),
            }],
        ))
        .replace(Relation::new(
            RelationID(2),
            vec![Member {
                id: RelationID(1).into(),
                role: String::new(),
            }],
        ));
    let graph = delete_relation(graph, RelationID(1));
    assert_eq!(graph.relations().count(), 0);
}

#[test]
fn test_remove_node_keeps_ring_closed() {
    let ring = Way::new(
        WayID(1),
        vec![NodeID(1), NodeID(2), NodeID(3), NodeID(4), NodeID(1)],
    );
    let without_start = ring.remove_node(NodeID(1));
    assert_eq!(
        without_start.nodes,
        vec![NodeID(2), NodeID(3), NodeID(4), NodeID(2)]
    );
    assert!(without_start.is_closed());
    assert!(!without_start.is_degenerate());
    assert!(without_start.remove_node(NodeID(3)).is_degenerate());
}
