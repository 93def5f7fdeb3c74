//! Straightens a chain of connected ways between its two ends. Interior nodes are pulled onto
//! the line between the ends; the ones that carry no information of their own are deleted.
//!
//! Loosely based on Potlatch 2's Straighten tool.

mod chain;
mod js;
mod projection;

use std::fmt;

use geo::{line_measures::LengthMeasurable, Coord, Euclidean, Line};

use edit_graph::{delete_node, EntityID, Graph, Node};

pub use chain::ChainError;
pub use js::JsStraighten;
pub use projection::{Identity, Projection, WebMercator};

/// Beyond this fraction of the distance between the ends, a node is too far off the line to
/// straighten.
const MAX_DEVIATION: f64 = 0.2;

/// Why a selection can't be straightened
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disabled {
    TooBendy,
    NotAChain(ChainError),
}

impl Disabled {
    /// The reason as the editor's UI refers to it
    pub fn reason(&self) -> &'static str {
        match self {
            Disabled::TooBendy => "too_bendy",
            Disabled::NotAChain(_) => "not_a_chain",
        }
    }
}

impl fmt::Display for Disabled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disabled::TooBendy => write!(f, "{}", self.reason()),
            Disabled::NotAChain(err) => write!(f, "{}: {}", self.reason(), err),
        }
    }
}

pub struct Straighten<P> {
    selected: Vec<EntityID>,
    projection: P,
}

impl<P: Projection> Straighten<P> {
    /// The action can be applied partially, to animate it.
    pub const TRANSITIONABLE: bool = true;

    /// `selected` holds the ways to join, and optionally two nodes on them to straighten between.
    pub fn new(selected: Vec<EntityID>, projection: P) -> Self {
        Self {
            selected,
            projection,
        }
    }

    pub fn transitionable(&self) -> bool {
        Self::TRANSITIONABLE
    }

    pub fn selected(&self) -> &[EntityID] {
        &self.selected
    }

    /// All selected ways as one continuous, ordered list of nodes
    pub fn all_nodes(&self, graph: &Graph) -> Result<Vec<Node>, ChainError> {
        chain::assemble(graph, &self.selected)
    }

    /// Returns a new graph with the chain straightened. `t` goes from 0 (no change) to 1 (fully
    /// straight); anything missing or non-finite means 1. Until `t` reaches 1, every node is only
    /// moved, never deleted.
    pub fn apply(&self, graph: &Graph, t: Option<f64>) -> Result<Graph, ChainError> {
        let t = match t {
            Some(t) if t.is_finite() => t.clamp(0.0, 1.0),
            _ => 1.0,
        };

        let nodes = self.all_nodes(graph)?;
        let points = self.project_all(&nodes);
        let start = points[0];
        let end = points[points.len() - 1];

        let mut result = graph.clone();
        let mut to_delete = Vec::new();
        for (node, point) in nodes.iter().zip(&points).take(nodes.len() - 1).skip(1) {
            let must_keep = t < 1.0
                || graph.parent_ways(node.id).len() > 1
                || !graph.parent_relations(node.id).is_empty()
                || node.has_interesting_tags();

            if must_keep {
                let u = position_along_way(*point, start, end);
                // A zero-length chord has no direction to project onto
                if !u.is_finite() {
                    continue;
                }
                let straight = self.projection.invert(point_on_chord(u, start, end));
                result = result.replace(node.moved(interpolate(node.loc, straight, t)));
            } else if !to_delete.contains(&node.id) {
                to_delete.push(node.id);
            }
        }

        log::debug!(
            "Straightening {} nodes with t = {t}, deleting {}",
            nodes.len(),
            to_delete.len()
        );
        for id in to_delete {
            result = delete_node(result, id);
        }
        Ok(result)
    }

    /// Checks whether the chain is close enough to straight to apply the action. Returns `None`
    /// if it is.
    pub fn disabled(&self, graph: &Graph) -> Option<Disabled> {
        let nodes = match self.all_nodes(graph) {
            Ok(nodes) => nodes,
            Err(err) => return Some(Disabled::NotAChain(err)),
        };
        let points = self.project_all(&nodes);
        let start = points[0];
        let end = points[points.len() - 1];

        let threshold = MAX_DEVIATION * distance(start, end);
        if threshold == 0.0 {
            return Some(Disabled::TooBendy);
        }

        for point in &points[1..points.len() - 1] {
            let u = position_along_way(*point, start, end);
            let dist = distance(point_on_chord(u, start, end), *point);
            if dist.is_nan() || dist > threshold {
                return Some(Disabled::TooBendy);
            }
        }
        None
    }

    fn project_all(&self, nodes: &[Node]) -> Vec<Coord> {
        nodes
            .iter()
            .map(|node| self.projection.project(node.loc))
            .collect()
    }
}

/// Where `pt` falls along the line from `start` to `end`: 0 at the start, 1 at the end, and
/// beyond that range if it's past either end.
fn position_along_way(pt: Coord, start: Coord, end: Coord) -> f64 {
    let chord = end - start;
    let offset = pt - start;
    (offset.x * chord.x + offset.y * chord.y) / (chord.x.powi(2) + chord.y.powi(2))
}

fn point_on_chord(u: f64, start: Coord, end: Coord) -> Coord {
    start + (end - start) * u
}

fn interpolate(from: Coord, to: Coord, t: f64) -> Coord {
    from + (to - from) * t
}

fn distance(pt1: Coord, pt2: Coord) -> f64 {
    Line::new(pt1, pt2).length(&Euclidean)
}
