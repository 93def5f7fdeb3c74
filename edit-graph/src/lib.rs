//! An OSM-style editing graph: nodes, ways and relations held in immutable snapshots.
//!
//! Every edit consumes a `Graph` and returns a new one. The entity tables sit behind `Arc`, so
//! cloning a snapshot to keep it around (for undo, or to try an edit speculatively) is cheap,
//! and a table is only copied the first time a shared snapshot gets edited.

mod actions;
#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use geo::Coord;
use serde::{Deserialize, Serialize};

pub use actions::{delete_node, delete_relation, delete_way};

pub type Tags = BTreeMap<String, String>;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeID(pub i64);
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct WayID(pub i64);
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct RelationID(pub i64);

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum EntityID {
    Node(NodeID),
    Way(WayID),
    Relation(RelationID),
}

impl From<NodeID> for EntityID {
    fn from(id: NodeID) -> Self {
        EntityID::Node(id)
    }
}
impl From<WayID> for EntityID {
    fn from(id: WayID) -> Self {
        EntityID::Way(id)
    }
}
impl From<RelationID> for EntityID {
    fn from(id: RelationID) -> Self {
        EntityID::Relation(id)
    }
}

impl fmt::Display for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}
impl fmt::Display for WayID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}
impl fmt::Display for RelationID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}
impl fmt::Display for EntityID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityID::Node(id) => id.fmt(f),
            EntityID::Way(id) => id.fmt(f),
            EntityID::Relation(id) => id.fmt(f),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseIdError {
    #[error("empty entity ID")]
    Empty,
    #[error("entity ID {0:?} doesn't start with n, w or r")]
    UnknownType(String),
    #[error("entity ID {0:?} doesn't end with a number")]
    BadNumber(String),
}

/// Parses the editor's textual IDs, like `n12`, `w3` or `r-1` (negative IDs are new entities
/// that haven't been uploaded yet).
impl FromStr for EntityID {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let prefix = chars.next().ok_or(ParseIdError::Empty)?;
        let num: i64 = chars
            .as_str()
            .parse()
            .map_err(|_| ParseIdError::BadNumber(s.to_string()))?;
        match prefix {
            'n' => Ok(EntityID::Node(NodeID(num))),
            'w' => Ok(EntityID::Way(WayID(num))),
            'r' => Ok(EntityID::Relation(RelationID(num))),
            _ => Err(ParseIdError::UnknownType(s.to_string())),
        }
    }
}

/// Keys that only record where data came from. A node carrying just these is still a plain
/// geometry vertex.
const UNINTERESTING_KEYS: [&str; 4] = ["attribution", "created_by", "source", "odbl"];
const UNINTERESTING_PREFIXES: [&str; 3] = ["source:", "source_ref", "tiger:"];

pub fn is_interesting_key(key: &str) -> bool {
    !UNINTERESTING_KEYS.contains(&key)
        && !UNINTERESTING_PREFIXES
            .iter()
            .any(|prefix| key.starts_with(prefix))
}

pub fn has_interesting_tags(tags: &Tags) -> bool {
    tags.keys().any(|key| is_interesting_key(key))
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Node {
    pub id: NodeID,
    /// x is longitude, y is latitude
    pub loc: Coord,
    pub tags: Tags,
}

impl Node {
    pub fn new(id: NodeID, loc: Coord) -> Node {
        Node {
            id,
            loc,
            tags: Tags::new(),
        }
    }

    pub fn with_tags(mut self, tags: Tags) -> Node {
        self.tags = tags;
        self
    }

    /// The same node at a different location
    pub fn moved(&self, loc: Coord) -> Node {
        Node {
            id: self.id,
            loc,
            tags: self.tags.clone(),
        }
    }

    pub fn has_interesting_tags(&self) -> bool {
        has_interesting_tags(&self.tags)
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Way {
    pub id: WayID,
    pub nodes: Vec<NodeID>,
    pub tags: Tags,
}

impl Way {
    pub fn new(id: WayID, nodes: Vec<NodeID>) -> Way {
        Way {
            id,
            nodes,
            tags: Tags::new(),
        }
    }

    pub fn with_tags(mut self, tags: Tags) -> Way {
        self.tags = tags;
        self
    }

    pub fn first(&self) -> Option<NodeID> {
        self.nodes.first().copied()
    }

    pub fn last(&self) -> Option<NodeID> {
        self.nodes.last().copied()
    }

    pub fn contains(&self, node: NodeID) -> bool {
        self.nodes.contains(&node)
    }

    pub fn is_closed(&self) -> bool {
        self.nodes.len() > 1 && self.first() == self.last()
    }

    /// A way can't be drawn with fewer than 2 distinct nodes, or 3 if it's a ring.
    pub fn is_degenerate(&self) -> bool {
        let unique: BTreeSet<NodeID> = self.nodes.iter().copied().collect();
        unique.len() < if self.is_closed() { 3 } else { 2 }
    }

    /// Drops every occurrence of the node, then any consecutive duplicates that leaves behind.
    /// A ring stays closed.
    pub fn remove_node(&self, node: NodeID) -> Way {
        let was_closed = self.is_closed();
        let mut nodes: Vec<NodeID> = self.nodes.iter().copied().filter(|x| *x != node).collect();
        nodes.dedup();
        if was_closed && !nodes.is_empty() && nodes.first() != nodes.last() {
            nodes.push(nodes[0]);
        }
        Way {
            id: self.id,
            nodes,
            tags: self.tags.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Member {
    pub id: EntityID,
    pub role: String,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Relation {
    pub id: RelationID,
    pub members: Vec<Member>,
    pub tags: Tags,
}

impl Relation {
    pub fn new(id: RelationID, members: Vec<Member>) -> Relation {
        Relation {
            id,
            members,
            tags: Tags::new(),
        }
    }

    pub fn has_member(&self, id: EntityID) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    pub fn remove_members_with_id(&self, id: EntityID) -> Relation {
        Relation {
            id: self.id,
            members: self
                .members
                .iter()
                .filter(|m| m.id != id)
                .cloned()
                .collect(),
            tags: self.tags.clone(),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum Entity {
    Node(Node),
    Way(Way),
    Relation(Relation),
}

impl Entity {
    pub fn id(&self) -> EntityID {
        match self {
            Entity::Node(n) => n.id.into(),
            Entity::Way(w) => w.id.into(),
            Entity::Relation(r) => r.id.into(),
        }
    }
}

impl From<Node> for Entity {
    fn from(x: Node) -> Self {
        Entity::Node(x)
    }
}
impl From<Way> for Entity {
    fn from(x: Way) -> Self {
        Entity::Way(x)
    }
}
impl From<Relation> for Entity {
    fn from(x: Relation) -> Self {
        Entity::Relation(x)
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum EntityRef<'a> {
    Node(&'a Node),
    Way(&'a Way),
    Relation(&'a Relation),
}

#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
#[serde(from = "Tables", into = "Tables")]
pub struct Graph {
    nodes: Arc<BTreeMap<NodeID, Node>>,
    ways: Arc<BTreeMap<WayID, Way>>,
    relations: Arc<BTreeMap<RelationID, Relation>>,

    // Reverse lookups, kept in sync by `replace` and `remove`. Empty sets aren't stored.
    node_to_ways: Arc<BTreeMap<NodeID, BTreeSet<WayID>>>,
    member_to_relations: Arc<BTreeMap<EntityID, BTreeSet<RelationID>>>,
}

// What's written to disk; the reverse lookups are rebuilt on load
#[derive(Serialize, Deserialize)]
struct Tables {
    nodes: Arc<BTreeMap<NodeID, Node>>,
    ways: Arc<BTreeMap<WayID, Way>>,
    relations: Arc<BTreeMap<RelationID, Relation>>,
}

impl From<Tables> for Graph {
    fn from(tables: Tables) -> Self {
        let mut graph = Graph {
            nodes: tables.nodes,
            ways: tables.ways,
            relations: tables.relations,
            node_to_ways: Arc::default(),
            member_to_relations: Arc::default(),
        };
        let ways: Vec<Way> = graph.ways.values().cloned().collect();
        for way in &ways {
            graph.index_way(way);
        }
        let relations: Vec<Relation> = graph.relations.values().cloned().collect();
        for relation in &relations {
            graph.index_relation(relation);
        }
        graph
    }
}

impl From<Graph> for Tables {
    fn from(graph: Graph) -> Self {
        Tables {
            nodes: graph.nodes,
            ways: graph.ways,
            relations: graph.relations,
        }
    }
}

impl Graph {
    pub fn new() -> Graph {
        Graph::default()
    }

    pub fn node(&self, id: NodeID) -> Option<&Node> {
        self.nodes.get(&id)
    }
    pub fn way(&self, id: WayID) -> Option<&Way> {
        self.ways.get(&id)
    }
    pub fn relation(&self, id: RelationID) -> Option<&Relation> {
        self.relations.get(&id)
    }

    pub fn entity(&self, id: EntityID) -> Option<EntityRef<'_>> {
        match id {
            EntityID::Node(id) => self.node(id).map(EntityRef::Node),
            EntityID::Way(id) => self.way(id).map(EntityRef::Way),
            EntityID::Relation(id) => self.relation(id).map(EntityRef::Relation),
        }
    }

    pub fn contains(&self, id: EntityID) -> bool {
        self.entity(id).is_some()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }
    pub fn ways(&self) -> impl Iterator<Item = &Way> {
        self.ways.values()
    }
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }

    /// Every way using this node, ordered by ID
    pub fn parent_ways(&self, node: NodeID) -> Vec<&Way> {
        self.node_to_ways
            .get(&node)
            .into_iter()
            .flatten()
            .filter_map(|id| self.ways.get(id))
            .collect()
    }

    /// Every relation with this entity as a member, ordered by ID
    pub fn parent_relations(&self, id: impl Into<EntityID>) -> Vec<&Relation> {
        self.member_to_relations
            .get(&id.into())
            .into_iter()
            .flatten()
            .filter_map(|id| self.relations.get(id))
            .collect()
    }

    /// Inserts or overwrites an entity, returning the new snapshot.
    pub fn replace(mut self, entity: impl Into<Entity>) -> Graph {
        match entity.into() {
            Entity::Node(n) => {
                Arc::make_mut(&mut self.nodes).insert(n.id, n);
            }
            Entity::Way(w) => {
                if let Some(old) = self.ways.get(&w.id).cloned() {
                    self.unindex_way(&old);
                }
                self.index_way(&w);
                Arc::make_mut(&mut self.ways).insert(w.id, w);
            }
            Entity::Relation(r) => {
                if let Some(old) = self.relations.get(&r.id).cloned() {
                    self.unindex_relation(&old);
                }
                self.index_relation(&r);
                Arc::make_mut(&mut self.relations).insert(r.id, r);
            }
        }
        self
    }

    /// Removes just this entity. References to it are left alone; the `delete_*` actions clean
    /// those up.
    pub fn remove(mut self, id: impl Into<EntityID>) -> Graph {
        match id.into() {
            EntityID::Node(id) => {
                if self.nodes.contains_key(&id) {
                    Arc::make_mut(&mut self.nodes).remove(&id);
                }
            }
            EntityID::Way(id) => {
                if let Some(old) = self.ways.get(&id).cloned() {
                    self.unindex_way(&old);
                    Arc::make_mut(&mut self.ways).remove(&id);
                }
            }
            EntityID::Relation(id) => {
                if let Some(old) = self.relations.get(&id).cloned() {
                    self.unindex_relation(&old);
                    Arc::make_mut(&mut self.relations).remove(&id);
                }
            }
        }
        self
    }

    /// True if the two snapshots still share all of their storage
    pub fn shares_storage_with(&self, other: &Graph) -> bool {
        Arc::ptr_eq(&self.nodes, &other.nodes)
            && Arc::ptr_eq(&self.ways, &other.ways)
            && Arc::ptr_eq(&self.relations, &other.relations)
    }

    fn index_way(&mut self, way: &Way) {
        let index = Arc::make_mut(&mut self.node_to_ways);
        for node in &way.nodes {
            index.entry(*node).or_default().insert(way.id);
        }
    }

    fn unindex_way(&mut self, way: &Way) {
        let index = Arc::make_mut(&mut self.node_to_ways);
        for node in &way.nodes {
            if let Some(parents) = index.get_mut(node) {
                parents.remove(&way.id);
                if parents.is_empty() {
                    index.remove(node);
                }
            }
        }
    }

    fn index_relation(&mut self, relation: &Relation) {
        let index = Arc::make_mut(&mut self.member_to_relations);
        for member in &relation.members {
            index.entry(member.id).or_default().insert(relation.id);
        }
    }

    fn unindex_relation(&mut self, relation: &Relation) {
        let index = Arc::make_mut(&mut self.member_to_relations);
        for member in &relation.members {
            if let Some(parents) = index.get_mut(&member.id) {
                parents.remove(&relation.id);
                if parents.is_empty() {
                    index.remove(&member.id);
                }
            }
        }
    }
}
