//! CLI tool to load the road network for an area into a Detour server.

use clap::Parser;
use detour_cli::DetourClient;
use detour_core::BoundingBox;

/// Ingest OpenStreetMap roads for a bounding box
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Detour server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    #[arg(long, allow_hyphen_values = true)]
    min_lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    min_lng: f64,

    #[arg(long, allow_hyphen_values = true)]
    max_lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    max_lng: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let bbox = BoundingBox::new(args.min_lat, args.min_lng, args.max_lat, args.max_lng)?;
    let client = DetourClient::new(&args.url);

    println!("Ingesting roads in [{}]...", bbox.cache_key());
    let summary = client.ingest(&bbox).await?;
    println!(
        "Ingested {} nodes from {} ways ({} edges written)",
        summary.nodes_ingested, summary.ways_processed, summary.edges_inserted
    );

    let stats = client.stats().await?;
    println!("Store now holds {} nodes and {} edges", stats.nodes, stats.edges);

    Ok(())
}
