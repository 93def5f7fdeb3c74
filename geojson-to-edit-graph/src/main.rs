use std::fs::File;
use std::io::BufWriter;

use anyhow::Result;
use clap::Parser;
use geojson_to_edit_graph::convert_geojson;

#[derive(Parser)]
struct Args {
    /// Path to a .geojson file to convert
    #[arg(long)]
    input: String,

    /// Output file to write
    #[arg(long, default_value = "graph.bin")]
    output: String,
}

fn main() -> Result<()> {
    simple_logger::init_with_level(log::Level::Info)?;

    let args = Args::parse();
    let graph = convert_geojson(std::fs::read_to_string(&args.input)?)?;

    let output = BufWriter::new(File::create(&args.output)?);
    bincode::serialize_into(output, &graph)?;
    log::info!("Wrote {}", args.output);
    Ok(())
}
