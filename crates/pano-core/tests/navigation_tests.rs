mod support;

use pano_core::{
    navigation, Command, FetchFailure, NavigationPolicy, PanoError, StationId, ViewerConfig,
    ViewerEvent,
};
use pollster::block_on;
use support::*;

fn id(s: &str) -> StationId {
    StationId::from(s)
}

fn marker_targets(s: &TestSession) -> Vec<String> {
    let s = s.borrow();
    let mut ids: Vec<String> = s
        .scene()
        .markers()
        .iter()
        .map(|m| m.target.id.0.clone())
        .collect();
    ids.sort();
    ids
}

#[test]
fn open_makes_station_current_with_its_markers() {
    let (s, src, loader) = (session(), street(), MemoryLoader::default());
    block_on(navigation::open(&s, &src, &loader, id("B"))).expect("open");

    let sess = s.borrow();
    assert!(sess.is_open());
    assert!(sess.frames().is_running());
    assert_eq!(sess.current_station().map(|st| st.id.clone()), Some(id("B")));
    assert_eq!(sess.scene().texture_station(), Some(&id("B")));
    assert_eq!(sess.renderer().live_targets(), vec!["A", "C"]);
    assert_eq!(sess.renderer().panoramas_set, 1);
    assert!((sess.scene().sphere_yaw_rad() - 12f32.to_radians()).abs() < 1e-6);
}

#[test]
fn there_and_back_leaves_only_the_first_stations_markers() {
    let (s, src, loader) = (session(), street(), MemoryLoader::default());
    block_on(navigation::open(&s, &src, &loader, id("A"))).expect("open");
    let before = marker_targets(&s);
    block_on(navigation::go_to(&s, &src, &loader, id("B"))).expect("A -> B");
    assert_eq!(marker_targets(&s), vec!["A", "C"]);
    block_on(navigation::go_to(&s, &src, &loader, id("A"))).expect("B -> A");

    assert_eq!(marker_targets(&s), before);
    let sess = s.borrow();
    let r = sess.renderer();
    assert_eq!(r.live_targets(), vec!["B"]);
    assert_eq!(r.created - r.disposed, 1, "leaked marker meshes");
}

#[test]
fn wheel_never_leaves_fov_range() {
    let (s, src, loader) = (session(), street(), MemoryLoader::default());
    block_on(navigation::open(&s, &src, &loader, id("A"))).expect("open");
    let mut sess = s.borrow_mut();
    for delta in [10000.0, 10000.0, -10000.0, 10000.0, -10000.0, -10000.0] {
        let fov = sess.wheel(delta, false).expect("open viewer zooms");
        assert!((10.0..=75.0).contains(&fov), "fov {fov}");
    }
    assert_eq!(sess.fov_degrees(), 10.0);
    sess.wheel(10000.0, false);
    assert_eq!(sess.fov_degrees(), 75.0);
}

#[test]
fn wheel_over_minimap_does_not_zoom() {
    let (s, src, loader) = (session(), street(), MemoryLoader::default());
    block_on(navigation::open(&s, &src, &loader, id("A"))).expect("open");
    let mut sess = s.borrow_mut();
    assert_eq!(sess.wheel(-200.0, true), None);
    assert_eq!(sess.fov_degrees(), 75.0);
}

#[test]
fn first_target_is_straight_ahead_after_load() {
    let src = MemorySource::default().with(
        "IMG001",
        station_json("IMG001", 0.0, 0.0, 90.0, &[("IMG002", 0.0, 0.001)]),
    );
    let (s, loader) = (session(), MemoryLoader::default());
    block_on(navigation::open(&s, &src, &loader, id("IMG001"))).expect("open");

    let sess = s.borrow();
    assert_close(sess.heading_degrees(), 90.0, 1e-3);
    let m = sess.scene().markers().iter().next().expect("one marker");
    let off_axis = m.relative_deg.min(360.0 - m.relative_deg);
    assert!(off_axis < 1e-3, "relative bearing {}", m.relative_deg);
}

#[test]
fn overlapping_navigations_end_on_the_last_one() {
    let (s, src) = (session(), street());
    let loader = MemoryLoader::default();
    block_on(navigation::open(&s, &src, &loader, id("A"))).expect("open");

    // A -> B and B -> C issued before either fetch returns
    let to_b = s.borrow_mut().begin_navigation(id("B"), false).expect("open");
    let to_c = s.borrow_mut().begin_navigation(id("C"), false).expect("open");
    let b = block_on(src_fetch(&src, "B"));
    let c = block_on(src_fetch(&src, "C"));
    let tex_b = s.borrow_mut().finish_metadata(to_b, b).expect("B ok");
    let tex_c = s.borrow_mut().finish_metadata(to_c, c).expect("C ok");

    assert_eq!(marker_targets(&s), vec!["B"]);
    assert_eq!(s.borrow().renderer().live_targets(), vec!["B"]);

    // B's panorama arriving late must not land on C
    let img = block_on(loader_load(&loader, "B"));
    s.borrow_mut()
        .finish_texture(tex_b.expect("pending B"), img)
        .expect("stale texture ignored");
    assert_eq!(s.borrow().scene().texture_station(), Some(&id("A")));

    let img = block_on(loader_load(&loader, "C"));
    s.borrow_mut()
        .finish_texture(tex_c.expect("pending C"), img)
        .expect("C texture");
    assert_eq!(s.borrow().scene().texture_station(), Some(&id("C")));
}

#[test]
fn latest_issued_policy_ignores_superseded_results() {
    let config = ViewerConfig {
        navigation_policy: NavigationPolicy::LatestIssued,
        ..ViewerConfig::default()
    };
    let (s, src) = (session_with(config), street());
    let loader = MemoryLoader::default();
    block_on(navigation::open(&s, &src, &loader, id("A"))).expect("open");

    let to_b = s.borrow_mut().begin_navigation(id("B"), false).expect("open");
    let to_c = s.borrow_mut().begin_navigation(id("C"), false).expect("open");
    let c = block_on(src_fetch(&src, "C"));
    assert!(s.borrow_mut().finish_metadata(to_c, c).expect("C").is_some());
    // B completes last but was issued first
    let b = block_on(src_fetch(&src, "B"));
    assert!(s.borrow_mut().finish_metadata(to_b, b).expect("B").is_none());
    assert_eq!(marker_targets(&s), vec!["B"]);
    assert_eq!(
        s.borrow().current_station().map(|st| st.id.clone()),
        Some(id("C"))
    );
}

#[test]
fn missing_metadata_keeps_previous_station() {
    let (s, src, loader) = (session(), street(), MemoryLoader::default());
    block_on(navigation::open(&s, &src, &loader, id("A"))).expect("open");
    let err = block_on(navigation::go_to(&s, &src, &loader, id("Z"))).expect_err("no Z");
    assert!(matches!(
        err,
        PanoError::MetadataFetch {
            kind: FetchFailure::NotFound,
            ..
        }
    ));

    {
        let sess = s.borrow();
        assert_eq!(sess.current_station().map(|st| st.id.clone()), Some(id("A")));
        assert_eq!(sess.renderer().live_targets(), vec!["B"]);
        assert_eq!(sess.last_error(), Some(&err));
    }

    // a later successful navigation clears the error
    block_on(navigation::go_to(&s, &src, &loader, id("B"))).expect("A -> B");
    assert!(s.borrow().last_error().is_none());
}

#[test]
fn undecodable_panorama_keeps_old_texture() {
    let (s, src) = (session(), street());
    let mut loader = MemoryLoader::default();
    loader.corrupt.insert("B".to_string());
    block_on(navigation::open(&s, &src, &loader, id("A"))).expect("open");
    let err = block_on(navigation::go_to(&s, &src, &loader, id("B"))).expect_err("corrupt");
    assert!(matches!(err, PanoError::TextureDecode { .. }));

    let sess = s.borrow();
    assert_eq!(sess.current_station().map(|st| st.id.clone()), Some(id("B")));
    assert_eq!(sess.scene().texture_station(), Some(&id("A")));
    assert_eq!(sess.renderer().panoramas_set, 1);
    assert!(matches!(sess.last_error(), Some(PanoError::TextureDecode { .. })));
}

#[test]
fn navigating_a_closed_viewer_is_refused() {
    let (s, src, loader) = (session(), street(), MemoryLoader::default());
    let err = block_on(navigation::go_to(&s, &src, &loader, id("A"))).expect_err("closed");
    assert_eq!(err, PanoError::NotOpen);
    assert!(src.fetched.borrow().is_empty());
}

#[test]
fn close_stops_frames_and_input() {
    let (s, src, loader) = (session(), street(), MemoryLoader::default());
    block_on(navigation::open(&s, &src, &loader, id("A"))).expect("open");
    assert!(s.borrow_mut().frame().is_some());

    s.borrow_mut().close();
    let mut sess = s.borrow_mut();
    assert!(!sess.is_open());
    assert!(!sess.frames().is_running());
    assert!(sess.frame().is_none());
    assert_eq!(sess.wheel(100.0, false), None);
    assert!(sess.renderer().live_targets().is_empty());
    assert_eq!(sess.renderer().released, 1);
    assert!(sess.pump_events().contains(&ViewerEvent::Closed));
}

#[test]
fn navigation_finishing_after_close_is_dropped() {
    let (s, src, loader) = (session(), street(), MemoryLoader::default());
    block_on(navigation::open(&s, &src, &loader, id("A"))).expect("open");
    let to_b = s.borrow_mut().begin_navigation(id("B"), false).expect("open");
    s.borrow_mut().close();
    let b = block_on(src_fetch(&src, "B"));
    assert_eq!(s.borrow_mut().finish_metadata(to_b, b), Ok(None));
    assert!(s.borrow().current_station().is_none());
    assert!(s.borrow().renderer().live_targets().is_empty());
}

#[test]
fn marker_click_walks_to_target() {
    let (s, src, loader) = (session(), street(), MemoryLoader::default());
    block_on(navigation::open(&s, &src, &loader, id("A"))).expect("open");
    let command = {
        let mut sess = s.borrow_mut();
        sess.frame();
        let m = sess.scene().markers().iter().next().expect("marker").clone();
        let ndc = sess.scene().camera.project(m.position);
        let px = glam::Vec2::new((ndc.x + 1.0) * 400.0, (1.0 - ndc.y) * 300.0);
        sess.pointer_down(px, true);
        sess.pointer_up(px)
    };
    assert_eq!(command, Some(Command::NavigateTo(id("B"))));
    block_on(navigation::execute(&s, &src, &loader, command.expect("command"))).expect("walk");
    assert_eq!(
        s.borrow().current_station().map(|st| st.id.clone()),
        Some(id("B"))
    );
}

#[test]
fn events_reach_the_minimap() {
    let (s, src, loader) = (session(), street(), MemoryLoader::default());
    block_on(navigation::open(&s, &src, &loader, id("A"))).expect("open");
    let events = s.borrow_mut().pump_events();
    assert!(events.contains(&ViewerEvent::Opened(id("A"))));
    assert!(events.contains(&ViewerEvent::StationChanged(id("A"))));
    assert!(events.contains(&ViewerEvent::TextureSwapped(id("A"))));

    let sess = s.borrow();
    let calls = &sess.minimap().map().calls;
    assert!(calls.contains(&MapCall::Select("A".to_string())));
    assert!(calls.iter().any(|c| matches!(c, MapCall::Center(p) if p.lat == 0.0 && p.lon == 0.0)));
    assert!(calls.iter().any(|c| matches!(c, MapCall::Fit(_))));
    let rotation = calls
        .iter()
        .rev()
        .find_map(|c| match c {
            MapCall::Rotate(d) => Some(*d),
            _ => None,
        })
        .expect("icon rotated");
    assert_close(rotation, 90.0, 1e-3);
}

async fn src_fetch(
    src: &MemorySource,
    name: &str,
) -> Result<pano_core::Station, PanoError> {
    use pano_core::StationSource;
    src.fetch_station(&id(name)).await
}

async fn loader_load(
    loader: &MemoryLoader,
    name: &str,
) -> Result<pano_core::PanoramaImage, PanoError> {
    use pano_core::PanoramaLoader;
    loader.load_panorama(name).await
}

fn fit_calls(s: &TestSession) -> usize {
    s.borrow()
        .minimap()
        .map()
        .calls
        .iter()
        .filter(|c| matches!(c, MapCall::Fit(_)))
        .count()
}

#[test]
fn reopening_the_same_station_refits_the_minimap() {
    let (s, src, loader) = (session(), street(), MemoryLoader::default());
    block_on(navigation::open(&s, &src, &loader, id("A"))).expect("open");
    s.borrow_mut().pump_events();
    assert_eq!(fit_calls(&s), 1);

    s.borrow_mut().close();
    s.borrow_mut().pump_events();
    assert_eq!(s.borrow().minimap().state().selected, None);

    block_on(navigation::open(&s, &src, &loader, id("A"))).expect("reopen");
    s.borrow_mut().pump_events();
    assert_eq!(fit_calls(&s), 2);
    let sess = s.borrow();
    let selects = sess
        .minimap()
        .map()
        .calls
        .iter()
        .filter(|c| **c == MapCall::Select("A".to_string()))
        .count();
    assert_eq!(selects, 2);
}

#[test]
fn jumping_to_the_current_station_recentres_the_minimap() {
    let (s, src, loader) = (session(), street(), MemoryLoader::default());
    block_on(navigation::open(&s, &src, &loader, id("A"))).expect("open");
    s.borrow_mut().pump_events();
    let centres_before = s
        .borrow()
        .minimap()
        .map()
        .calls
        .iter()
        .filter(|c| matches!(c, MapCall::Center(_)))
        .count();

    block_on(navigation::execute(&s, &src, &loader, Command::NavigateTo(id("A"))))
        .expect("stay at A");
    s.borrow_mut().pump_events();

    let sess = s.borrow();
    let centres_after = sess
        .minimap()
        .map()
        .calls
        .iter()
        .filter(|c| matches!(c, MapCall::Center(_)))
        .count();
    assert_eq!(centres_after, centres_before + 1);
    drop(sess);
    assert_eq!(fit_calls(&s), 2);
}
