use detour_core::BoundingBox;
use detour_osm::{MapDataProvider, OverpassClient};

#[tokio::test]
#[ignore = "requires network access to the public Overpass API"]
async fn fetches_highways_around_connaught_place() {
    let client = OverpassClient::default();
    let bbox = BoundingBox::new(28.630, 77.215, 28.634, 77.221).unwrap();

    let network = client.fetch_road_network(&bbox).await.unwrap();

    assert!(network.way_count() > 0);
    assert!(network.node_count() > 0);
    for way in network.ways.iter().filter(|w| w.is_routable()) {
        let segments = network.segments(way).unwrap();
        assert!(segments.iter().all(|s| s.distance_m > 0.0));
    }
}
