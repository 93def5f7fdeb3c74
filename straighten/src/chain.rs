use edit_graph::{EntityID, Graph, Node, NodeID};
use petgraph::graphmap::UnGraphMap;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("no ways are selected")]
    EmptySelection,
    #[error("{0} isn't in the graph")]
    MissingEntity(EntityID),
    #[error("the selected ways form a loop with no free end")]
    NoFreeEnd,
    #[error("the selected ways don't form one continuous line")]
    Disconnected,
    #[error("{0} isn't on the selected ways")]
    NodeNotInChain(NodeID),
    #[error("there are fewer than two nodes to straighten")]
    TooShort,
}

/// Joins the selected ways end-to-end into one ordered list of nodes, each shared joint
/// appearing once. If exactly two nodes are also selected, only the stretch between them is
/// returned.
pub(crate) fn assemble(graph: &Graph, selected: &[EntityID]) -> Result<Vec<Node>, ChainError> {
    let mut remaining_ways: Vec<Vec<NodeID>> = Vec::new();
    let mut selected_nodes = Vec::new();
    for id in selected {
        match *id {
            EntityID::Way(way_id) => {
                let way = graph.way(way_id).ok_or(ChainError::MissingEntity(*id))?;
                if way.nodes.is_empty() {
                    log::warn!("Ignoring {way_id}, it has no nodes");
                } else {
                    remaining_ways.push(way.nodes.clone());
                }
            }
            EntityID::Node(node_id) => {
                graph.node(node_id).ok_or(ChainError::MissingEntity(*id))?;
                selected_nodes.push(node_id);
            }
            EntityID::Relation(_) => {}
        }
    }
    if remaining_ways.is_empty() {
        return Err(ChainError::EmptySelection);
    }
    check_connected(&remaining_ways)?;

    // A node that starts (or ends) two different ways is a joint in the middle of the chain, not
    // a candidate for either end
    let starts = occurring_once(remaining_ways.iter().map(|way| way[0]));
    let ends = occurring_once(remaining_ways.iter().map(|way| way[way.len() - 1]));
    let mut current = starts
        .iter()
        .filter(|n| !ends.contains(*n))
        .chain(ends.iter().filter(|n| !starts.contains(*n)))
        .next()
        .copied()
        .ok_or(ChainError::NoFreeEnd)?;

    let mut nodes: Vec<NodeID> = Vec::new();
    while !remaining_ways.is_empty() {
        let idx = remaining_ways
            .iter()
            .position(|way| way[0] == current || way[way.len() - 1] == current)
            .ok_or(ChainError::Disconnected)?;
        let mut next = remaining_ways.remove(idx);
        if next[0] != current {
            next.reverse();
        }
        // The joint is already the last node
        let skip = usize::from(!nodes.is_empty());
        nodes.extend(next.into_iter().skip(skip));
        if let Some(last) = nodes.last() {
            current = *last;
        }
    }

    if let &[node1, node2] = selected_nodes.as_slice() {
        let idx1 = position(&nodes, node1)?;
        let idx2 = position(&nodes, node2)?;
        let (from, to) = (idx1.min(idx2), idx1.max(idx2));
        nodes = nodes[from..=to].to_vec();
    }

    if nodes.len() < 2 {
        return Err(ChainError::TooShort);
    }
    nodes
        .into_iter()
        .map(|id| {
            graph
                .node(id)
                .cloned()
                .ok_or(ChainError::MissingEntity(id.into()))
        })
        .collect()
}

// Branching or disjoint selections would otherwise only be noticed partway through the walk
fn check_connected(ways: &[Vec<NodeID>]) -> Result<(), ChainError> {
    let mut graph: UnGraphMap<NodeID, ()> = UnGraphMap::new();
    for way in ways {
        graph.add_node(way[0]);
        for pair in way.windows(2) {
            graph.add_edge(pair[0], pair[1], ());
        }
    }
    if petgraph::algo::connected_components(&graph) == 1 {
        Ok(())
    } else {
        Err(ChainError::Disconnected)
    }
}

fn occurring_once(ids: impl Iterator<Item = NodeID>) -> Vec<NodeID> {
    let ids: Vec<NodeID> = ids.collect();
    ids.iter()
        .filter(|id| ids.iter().filter(|x| x == id).count() == 1)
        .copied()
        .collect()
}

fn position(nodes: &[NodeID], node: NodeID) -> Result<usize, ChainError> {
    nodes
        .iter()
        .position(|x| *x == node)
        .ok_or(ChainError::NodeNotInChain(node))
}
