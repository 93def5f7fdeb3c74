use std::collections::HashMap;

use anyhow::{bail, Result};
use geo::{Coord, LineString};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonValue, Value};
use log::{debug, info};

use edit_graph::{EntityID, Graph, Node, NodeID, Tags, Way, WayID};

/// Converts GeoJSON into an editing graph. Every LineString becomes a way, and LineStrings
/// touching at the same point share a node there. Points become nodes too, carrying their
/// properties as tags. An `id` property like `w3` or `n7` is kept as the entity's ID; everything
/// else gets a fresh one.
pub fn convert_geojson(input_string: String) -> Result<Graph> {
    let collection = FeatureCollection::try_from(input_string.parse::<GeoJson>()?)?;

    let mut points = Vec::new();
    let mut lines = Vec::new();
    let mut skipped = 0;
    for feature in collection.features {
        let (id, tags) = read_properties(&feature)?;
        let Some(geometry) = feature.geometry else {
            skipped += 1;
            continue;
        };
        match geometry.value {
            Value::Point(pt) => {
                let id = match id {
                    None => None,
                    Some(EntityID::Node(id)) => Some(id),
                    Some(other) => bail!("{other} is a Point, so its ID should start with n"),
                };
                points.push(InputNode {
                    id,
                    pt: to_coord(&pt)?,
                    tags,
                });
            }
            Value::LineString(pts) => {
                let id = match id {
                    None => None,
                    Some(EntityID::Way(id)) => Some(id),
                    Some(other) => bail!("{other} is a LineString, so its ID should start with w"),
                };
                if pts.len() < 2 {
                    bail!("A LineString only has {} points", pts.len());
                }
                lines.push(InputWay {
                    id,
                    pts: pts.iter().map(|pt| to_coord(pt)).collect::<Result<_>>()?,
                    tags,
                });
            }
            _ => {
                skipped += 1;
            }
        }
    }
    if lines.is_empty() {
        bail!("No LineStrings in the input. The input is probably incorrect.");
    }
    if skipped > 0 {
        debug!("Skipped {skipped} features that aren't a Point or LineString");
    }

    let mut builder = Builder {
        graph: Graph::new(),
        node_to_id: HashMap::new(),
        next_node: next_free(points.iter().filter_map(|x| x.id.map(|id| id.0))),
        next_way: next_free(lines.iter().filter_map(|x| x.id.map(|id| id.0))),
    };
    // Points first, so lines reuse their nodes and IDs
    for point in points {
        builder.add_point(point)?;
    }
    for line in lines {
        builder.add_line(line)?;
    }

    let graph = builder.graph;
    info!(
        "{} nodes and {} ways total",
        graph.nodes().count(),
        graph.ways().count()
    );
    Ok(graph)
}

/// The inverse of `convert_geojson`: every way as a LineString and every node as a Point, with
/// tags and an `id` property.
pub fn to_feature_collection(graph: &Graph) -> FeatureCollection {
    let mut features = Vec::new();
    for way in graph.ways() {
        let line_string: LineString = way
            .nodes
            .iter()
            .filter_map(|id| graph.node(*id))
            .map(|node| node.loc)
            .collect();
        let mut f = Feature::from(Geometry::new(Value::from(&line_string)));
        f.set_property("id", way.id.to_string());
        for (key, value) in &way.tags {
            f.set_property(key.clone(), value.clone());
        }
        features.push(f);
    }
    for node in graph.nodes() {
        let mut f = Feature::from(Geometry::new(Value::Point(vec![node.loc.x, node.loc.y])));
        f.set_property("id", node.id.to_string());
        for (key, value) in &node.tags {
            f.set_property(key.clone(), value.clone());
        }
        features.push(f);
    }
    features.into_iter().collect()
}

struct InputNode {
    id: Option<NodeID>,
    pt: Coord,
    tags: Tags,
}

struct InputWay {
    id: Option<WayID>,
    pts: Vec<Coord>,
    tags: Tags,
}

struct Builder {
    graph: Graph,
    node_to_id: HashMap<(isize, isize), NodeID>,
    next_node: i64,
    next_way: i64,
}

impl Builder {
    fn add_point(&mut self, input: InputNode) -> Result<()> {
        let id = self.node_at(input.pt, input.id)?;
        if let Some(node) = self.graph.node(id) {
            // Two Points in the same place are the same node
            let mut node = node.clone();
            node.tags.extend(input.tags);
            self.graph = std::mem::take(&mut self.graph).replace(node);
        }
        Ok(())
    }

    fn add_line(&mut self, input: InputWay) -> Result<()> {
        let mut nodes = Vec::new();
        for pt in input.pts {
            nodes.push(self.node_at(pt, None)?);
        }
        nodes.dedup();

        let id = match input.id {
            Some(id) => {
                if self.graph.way(id).is_some() {
                    bail!("{id} is used twice");
                }
                id
            }
            None => {
                self.next_way += 1;
                WayID(self.next_way - 1)
            }
        };
        self.graph =
            std::mem::take(&mut self.graph).replace(Way::new(id, nodes).with_tags(input.tags));
        Ok(())
    }

    fn node_at(&mut self, pt: Coord, id: Option<NodeID>) -> Result<NodeID> {
        let key = hashify_point(pt);
        if let Some(existing) = self.node_to_id.get(&key) {
            return Ok(*existing);
        }
        let id = match id {
            Some(id) => {
                if self.graph.node(id).is_some() {
                    bail!("{id} is used twice");
                }
                id
            }
            None => {
                self.next_node += 1;
                NodeID(self.next_node - 1)
            }
        };
        self.node_to_id.insert(key, id);
        self.graph = std::mem::take(&mut self.graph).replace(Node::new(id, pt));
        Ok(id)
    }
}

fn read_properties(feature: &Feature) -> Result<(Option<EntityID>, Tags)> {
    let mut id = None;
    if let Some(geojson::feature::Id::String(x)) = &feature.id {
        id = Some(x.parse()?);
    }

    let mut tags = Tags::new();
    for (key, value) in feature.properties.iter().flatten() {
        let value = match value {
            JsonValue::String(x) if key == "id" => {
                id = Some(x.parse()?);
                continue;
            }
            JsonValue::String(x) => x.clone(),
            JsonValue::Number(x) => x.to_string(),
            JsonValue::Bool(x) => x.to_string(),
            _ => continue,
        };
        tags.insert(key.clone(), value);
    }
    Ok((id, tags))
}

fn to_coord(pt: &[f64]) -> Result<Coord> {
    if pt.len() < 2 {
        bail!("A position only has {} numbers", pt.len());
    }
    Ok(Coord { x: pt[0], y: pt[1] })
}

fn next_free(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0).max(0) + 1
}

fn hashify_point(pt: Coord) -> (isize, isize) {
    ((pt.x * 1_000_000.0) as isize, (pt.y * 1_000_000.0) as isize)
}

#[cfg(target_arch = "wasm32")]
use std::sync::Once;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
static START: Once = Once::new();

/// Converts GeoJSON into the bincoded graph, so a web tool can build files for the editor.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen()]
pub fn convert(input_string: String) -> Result<Vec<u8>, JsValue> {
    START.call_once(|| {
        console_error_panic_hook::set_once();
    });

    let graph = convert_geojson(input_string).map_err(|err| JsValue::from_str(&err.to_string()))?;
    bincode::serialize(&graph).map_err(|err| JsValue::from_str(&err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "id": "w10", "highway": "primary", "lanes": 2 },
                "geometry": { "type": "LineString", "coordinates": [[0, 0], [1, 0], [2, 0]] }
            },
            {
                "type": "Feature",
                "properties": { "highway": "service" },
                "geometry": { "type": "LineString", "coordinates": [[2, 0], [2, 1]] }
            },
            {
                "type": "Feature",
                "properties": { "id": "n5", "highway": "crossing" },
                "geometry": { "type": "Point", "coordinates": [1, 0] }
            },
            {
                "type": "Feature",
                "properties": { "name": "ignored" },
                "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [1, 1], [0, 1], [0, 0]]] }
            }
        ]
    }"#;

    #[test]
    fn test_convert() {
        let graph = convert_geojson(INPUT.to_string()).unwrap();
        assert_eq!(graph.ways().count(), 2);
        // The joint at (2, 0) is shared
        assert_eq!(graph.nodes().count(), 4);

        let primary = graph.way(WayID(10)).unwrap();
        assert_eq!(primary.tags["highway"], "primary");
        assert_eq!(primary.tags["lanes"], "2");
        // The Point kept its ID and became the middle of the line
        assert_eq!(primary.nodes[1], NodeID(5));
        assert!(graph.node(NodeID(5)).unwrap().has_interesting_tags());

        let service = graph.way(WayID(11)).unwrap();
        assert_eq!(service.nodes[0], primary.nodes[2]);
        assert_eq!(graph.parent_ways(primary.nodes[2]).len(), 2);
    }

    #[test]
    fn test_round_trip_keeps_ids() {
        let graph = convert_geojson(INPUT.to_string()).unwrap();
        let gj = GeoJson::from(to_feature_collection(&graph)).to_string();
        let again = convert_geojson(gj).unwrap();
        assert_eq!(again, graph);
    }

    #[test]
    fn test_bad_input() {
        assert!(convert_geojson("not json".to_string()).is_err());

        let only_points = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [0, 0]}}
        ]}"#;
        assert!(convert_geojson(only_points.to_string()).is_err());

        let wrong_id = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"id": "n1"},
             "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}}
        ]}"#;
        assert!(convert_geojson(wrong_id.to_string()).is_err());
    }
}
