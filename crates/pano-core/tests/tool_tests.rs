mod support;

use pano_core::{
    navigation, Command, FeatureCollection, GeoPoint, LayoutMode, PanoError, StationId,
    StreetViewTool,
};
use pollster::block_on;
use support::*;

const POINTS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    { "type": "Feature", "geometry": { "type": "Point", "coordinates": [0.0, 0.0] },
      "properties": { "station_id": "A" } },
    { "type": "Feature", "geometry": { "type": "Point", "coordinates": [0.001, 0.0] },
      "properties": { "station_id": "B" } },
    { "type": "Feature", "geometry": { "type": "Point", "coordinates": [0.002, 0.0] },
      "properties": { "station_id": "C" } }
  ]
}"#;

fn points() -> FeatureCollection {
    FeatureCollection::from_json(POINTS).expect("points geojson")
}

#[test]
fn main_map_click_opens_then_walks() {
    let (s, src, loader) = (session(), street(), MemoryLoader::default());
    let fc = points();
    let mut tool = StreetViewTool::new();
    tool.toggle();

    let near_c = GeoPoint::new(0.0001, 0.0019);
    let cmd = tool
        .main_map_click(near_c, &fc, "station_id", s.borrow().is_open())
        .expect("points exist")
        .expect("tool active");
    assert_eq!(cmd, Command::Open(StationId::from("C")));
    block_on(navigation::execute(&s, &src, &loader, cmd)).expect("open C");
    tool.panorama_opened();
    assert_eq!(tool.layout(), LayoutMode::Panorama);

    let near_a = GeoPoint::new(0.0, 0.0002);
    let cmd = tool
        .main_map_click(near_a, &fc, "station_id", s.borrow().is_open())
        .expect("points exist")
        .expect("tool active");
    assert_eq!(cmd, Command::NavigateTo(StationId::from("A")));
    block_on(navigation::execute(&s, &src, &loader, cmd)).expect("walk to A");
    assert_eq!(
        s.borrow().current_station().map(|st| st.id.clone()),
        Some(StationId::from("A"))
    );
}

#[test]
fn click_without_points_reports_no_neighbour() {
    let mut tool = StreetViewTool::new();
    tool.toggle();
    let empty = FeatureCollection::default();
    let err = tool
        .main_map_click(GeoPoint::new(1.0, 2.0), &empty, "station_id", false)
        .expect_err("nothing to pick");
    assert!(matches!(err, PanoError::NoNeighborFound { .. }));
}

#[test]
fn minimap_click_opens_or_navigates() {
    let (s, src, loader) = (session(), street(), MemoryLoader::default());
    s.borrow_mut().set_station_points(&points());

    assert_eq!(s.borrow().minimap_click(&StationId::from("nope")), None);
    let cmd = s
        .borrow()
        .minimap_click(&StationId::from("B"))
        .expect("known point");
    assert_eq!(cmd, Command::Open(StationId::from("B")));
    block_on(navigation::execute(&s, &src, &loader, cmd)).expect("open B");

    let cmd = s
        .borrow()
        .minimap_click(&StationId::from("C"))
        .expect("known point");
    assert_eq!(cmd, Command::NavigateTo(StationId::from("C")));
}

#[test]
fn minimap_centres_on_feature_point() {
    let (s, src, loader) = (session(), street(), MemoryLoader::default());
    s.borrow_mut().set_station_points(&points());
    block_on(navigation::open(&s, &src, &loader, StationId::from("B"))).expect("open");
    s.borrow_mut().pump_events();

    let sess = s.borrow();
    let state = sess.minimap().state();
    assert_eq!(state.selected, Some(StationId::from("B")));
    let center = state.center.expect("centred");
    assert_close(center.lon, 0.001, 1e-12);
    let bounds = state.bounds.expect("fitted");
    assert!(bounds.west < 0.001 && bounds.east > 0.001);
    assert!(bounds.south < 0.0 && bounds.north > 0.0);
}
