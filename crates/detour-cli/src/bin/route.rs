//! CLI tool to request a hazard-aware route from a Detour server.

use clap::Parser;
use detour_cli::DetourClient;
use detour_core::LatLng;

/// Request a route between two points
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Detour server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Origin latitude
    #[arg(long, allow_hyphen_values = true)]
    from_lat: f64,

    /// Origin longitude
    #[arg(long, allow_hyphen_values = true)]
    from_lng: f64,

    /// Destination latitude
    #[arg(long, allow_hyphen_values = true)]
    to_lat: f64,

    /// Destination longitude
    #[arg(long, allow_hyphen_values = true)]
    to_lng: f64,

    /// Print the full response as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let client = DetourClient::new(&args.url);

    let start = LatLng::new(args.from_lat, args.from_lng);
    let end = LatLng::new(args.to_lat, args.to_lng);

    let Some(route) = client.route(start, end).await? else {
        eprintln!("No route found");
        std::process::exit(2);
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&route)?);
        return Ok(());
    }

    println!("Route: {} waypoints", route.path.len());
    println!("  Distance: {:.0} m", route.total_distance);
    println!("  Cost:     {:.1}", route.total_cost);
    println!("  ETA:      {:.1} min", route.estimated_time);
    for point in &route.path {
        println!("  {:.6}, {:.6}", point.lat, point.lng);
    }

    Ok(())
}
