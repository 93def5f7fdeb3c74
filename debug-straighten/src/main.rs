use anyhow::{bail, Result};
use clap::Parser;
use geo::{line_measures::LengthMeasurable, Haversine, LineString};

use edit_graph::{EntityID, Graph};
use geojson_to_edit_graph::to_feature_collection;
use straighten::{Straighten, WebMercator};

/// Straightens part of a graph.bin file and writes the result as GeoJSON, to check the action
/// outside the browser.
#[derive(Parser)]
struct Args {
    /// Path to a graph.bin file
    input: String,

    /// Comma-separated IDs to straighten, like `w1,w2` or `w1,n4,n9`
    #[arg(long, value_delimiter = ',', required = true)]
    select: Vec<EntityID>,

    /// How far to straighten, from 0 to 1
    #[arg(long)]
    t: Option<f64>,

    /// Straightness is judged in screen space at this zoom
    #[arg(long, default_value_t = 16.0)]
    zoom: f64,

    /// Output file to write
    #[arg(long, default_value = "debug.geojson")]
    output: String,
}

fn main() -> Result<()> {
    simple_logger::init_with_level(log::Level::Info)?;

    let args = Args::parse();
    let bytes = std::fs::read(&args.input)?;
    let graph: Graph = bincode::deserialize(&bytes)?;

    let action = Straighten::new(args.select.clone(), WebMercator::for_zoom(args.zoom));
    if let Some(reason) = action.disabled(&graph) {
        bail!("Can't straighten {:?}: {reason}", args.select);
    }

    let before = action.all_nodes(&graph)?;
    let result = action.apply(&graph, args.t)?;
    log::info!(
        "Chain of {} nodes, {:.1}m long. {} nodes left in the graph, down from {}",
        before.len(),
        length_meters(&before.iter().map(|node| node.loc).collect()),
        result.nodes().count(),
        graph.nodes().count()
    );

    let gj = geojson::GeoJson::from(to_feature_collection(&result));
    std::fs::write(&args.output, serde_json::to_string_pretty(&gj)?)?;
    log::info!("Wrote {}", args.output);
    Ok(())
}

fn length_meters(line_string: &LineString) -> f64 {
    line_string.length(&Haversine)
}
