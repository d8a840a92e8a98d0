use std::cell::RefCell;
use std::path::{Path, PathBuf};

use anyhow::Context;
use pano_core::{
    navigation, parse_station, FeatureCollection, FetchFailure, GeoBounds, GeoPoint, MeshHandle,
    MiniMap, PanoError, PanoramaImage, PanoramaLoader, SceneRenderer, SceneView, Session, Station,
    StationId, StationSource, ViewerConfig,
};

const USAGE: &str = "usage: pano-native <site_root> <start_station> [steps]";

/// Maps a site-relative URL from the config onto the local site root.
fn local_path(root: &Path, url: &str) -> PathBuf {
    root.join(url.trim_start_matches('/'))
}

struct FsStationSource {
    root: PathBuf,
    config: ViewerConfig,
}

impl StationSource for FsStationSource {
    async fn fetch_station(&self, id: &StationId) -> Result<Station, PanoError> {
        let path = local_path(&self.root, &self.config.metadata_url(id));
        let text = std::fs::read_to_string(&path).map_err(|e| {
            let kind = if e.kind() == std::io::ErrorKind::NotFound {
                FetchFailure::NotFound
            } else {
                FetchFailure::Network
            };
            PanoError::metadata(id, kind, format!("{}: {}", path.display(), e))
        })?;
        parse_station(id, &text)
    }
}

struct FsPanoramaLoader {
    root: PathBuf,
    config: ViewerConfig,
}

impl PanoramaLoader for FsPanoramaLoader {
    async fn load_panorama(&self, image: &str) -> Result<PanoramaImage, PanoError> {
        let path = local_path(&self.root, &self.config.image_url(image));
        let bytes = std::fs::read(&path)
            .map_err(|e| PanoError::texture(image, format!("{}: {}", path.display(), e)))?;
        let rgba = image::load_from_memory(&bytes)
            .map_err(|e| PanoError::texture(image, e.to_string()))?
            .to_rgba8();
        let (w, h) = rgba.dimensions();
        PanoramaImage::new(w, h, rgba.into_raw())
    }
}

/// Stands in for the GPU: tracks marker meshes and logs each frame.
#[derive(Default)]
struct LogRenderer {
    next: u32,
    live: usize,
    panorama: Option<(u32, u32)>,
}

impl SceneRenderer for LogRenderer {
    fn create_marker(&mut self, target: &StationId) -> MeshHandle {
        self.next += 1;
        self.live += 1;
        log::debug!("[render] marker #{} -> {}", self.next, target);
        MeshHandle(self.next)
    }

    fn dispose_marker(&mut self, handle: MeshHandle) {
        self.live = self.live.saturating_sub(1);
        log::debug!("[render] dispose #{}", handle.0);
    }

    fn set_panorama(&mut self, image: &PanoramaImage) -> Result<(), PanoError> {
        log::info!("[render] panorama {}x{}", image.width, image.height);
        self.panorama = Some((image.width, image.height));
        Ok(())
    }

    fn release_panorama(&mut self) {
        self.panorama = None;
    }

    fn resize(&mut self, width: u32, height: u32) {
        log::debug!("[render] viewport {}x{}", width, height);
    }

    fn draw(&mut self, view: &SceneView) -> Result<(), PanoError> {
        let visible = view.markers.iter().filter(|m| m.visible).count();
        log::debug!(
            "[render] frame: {}/{} markers visible, {} live, sphere yaw {:.1}",
            visible,
            view.markers.len(),
            self.live,
            view.sphere_yaw_rad.to_degrees()
        );
        Ok(())
    }
}

struct LogMap;

impl MiniMap for LogMap {
    fn set_selected_station(&mut self, id: &StationId) {
        log::info!("[minimap] select {}", id);
    }
    fn set_center(&mut self, c: GeoPoint) {
        log::info!("[minimap] center ({:.6}, {:.6})", c.lat, c.lon);
    }
    fn fit_bounds(&mut self, b: GeoBounds) {
        log::debug!(
            "[minimap] fit [{:.6}, {:.6}, {:.6}, {:.6}]",
            b.west,
            b.south,
            b.east,
            b.north
        );
    }
    fn set_icon_rotation(&mut self, degrees: f64) {
        log::info!("[minimap] icon rotation {:.1}", degrees);
    }
}

type NativeSession = RefCell<Session<LogRenderer, LogMap>>;

fn load_config(root: &Path) -> anyhow::Result<ViewerConfig> {
    let path = root.join("viewer.json");
    if !path.exists() {
        return Ok(ViewerConfig::default());
    }
    let text =
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    ViewerConfig::from_json(&text)
}

fn report(session: &NativeSession) {
    let s = session.borrow();
    let Some(station) = s.current_station() else {
        println!("(no station)");
        return;
    };
    println!(
        "{} at ({:.6}, {:.6}) heading {:.1} fov {:.0}",
        station.id,
        station.position.lat,
        station.position.lon,
        s.heading_degrees(),
        s.fov_degrees()
    );
    for m in s.scene().markers().iter() {
        println!(
            "  -> {:<12} bearing {:>6.1}  relative {:>6.1}  {}  at ({:.2}, {:.2}, {:.2})",
            m.target.id.as_str(),
            m.bearing_deg,
            m.relative_deg,
            if m.visible { "visible" } else { "hidden " },
            m.position.x,
            m.position.y,
            m.position.z
        );
    }
    if let Some(e) = s.last_error() {
        println!("  last error: {}", e);
    }
}

/// Next station to walk to: the first target that does not lead straight back.
fn next_target(session: &NativeSession, came_from: Option<&StationId>) -> Option<StationId> {
    let s = session.borrow();
    let station = s.current_station()?;
    station
        .targets
        .iter()
        .find(|t| Some(&t.id) != came_from)
        .or_else(|| station.targets.first())
        .map(|t| t.id.clone())
}

async fn walkthrough(
    session: &NativeSession,
    source: &FsStationSource,
    loader: &FsPanoramaLoader,
    start: StationId,
    steps: usize,
) -> anyhow::Result<()> {
    if let Err(e) = navigation::open(session, source, loader, start.clone()).await {
        // a missing panorama still leaves the station open
        if !session.borrow().is_open() {
            return Err(e.into());
        }
        log::warn!("[walk] {}", e);
    }
    session.borrow_mut().frame();
    report(session);

    let mut came_from: Option<StationId> = None;
    for step in 1..=steps {
        let Some(next) = next_target(session, came_from.as_ref()) else {
            log::info!("[walk] dead end after {} step(s)", step - 1);
            break;
        };
        came_from = session.borrow().current_station().map(|s| s.id.clone());
        log::info!("[walk] step {}: {}", step, next);
        if let Err(e) = navigation::go_to(session, source, loader, next).await {
            log::warn!("[walk] {}", e);
        }
        session.borrow_mut().frame();
        report(session);
    }

    session.borrow_mut().close();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let root = PathBuf::from(args.next().context(USAGE)?);
    let start = StationId::from(args.next().context(USAGE)?);
    let steps = args
        .next()
        .map(|s| s.parse::<usize>())
        .transpose()
        .context("steps must be a whole number")?
        .unwrap_or(3);

    let config = load_config(&root)?;
    let mut session = Session::new(config.clone(), LogRenderer::default(), LogMap);
    session.resize(1280, 720);
    let points_path = local_path(&root, &config.points_url);
    if let Ok(text) = std::fs::read_to_string(&points_path) {
        let points = FeatureCollection::from_json(&text)
            .with_context(|| format!("parsing {}", points_path.display()))?;
        session.set_station_points(&points);
    }
    let session = RefCell::new(session);

    let source = FsStationSource {
        root: root.clone(),
        config: config.clone(),
    };
    let loader = FsPanoramaLoader { root, config };
    pollster::block_on(walkthrough(&session, &source, &loader, start, steps))
}
