//! One street-view viewer instance and everything it owns.

use glam::Vec2;

use crate::config::ViewerConfig;
use crate::error::{ErrorState, PanoError};
use crate::events::{EventBus, ViewerEvent};
use crate::frame::FrameLoop;
use crate::markers::{Activatable, Command};
use crate::minimap::MiniMapSync;
use crate::navigation::{NavTicket, PendingTexture, Walker};
use crate::scene::PanoScene;
use crate::services::{MiniMap, PanoramaImage, SceneRenderer};
use crate::station::{FeatureCollection, SharedStation, Station, StationId};

/// Viewer context. Several sessions can coexist; nothing here is global.
pub struct Session<R: SceneRenderer, M: MiniMap> {
    config: ViewerConfig,
    scene: PanoScene,
    renderer: R,
    minimap: MiniMapSync<M>,
    walker: Walker,
    bus: EventBus,
    frames: FrameLoop,
    errors: ErrorState,
    open: bool,
}

impl<R: SceneRenderer, M: MiniMap> Session<R, M> {
    pub fn new(config: ViewerConfig, renderer: R, minimap: M) -> Self {
        let walker = Walker::new(config.navigation_policy);
        Self {
            config,
            scene: PanoScene::new(),
            renderer,
            minimap: MiniMapSync::new(minimap),
            walker,
            bus: EventBus::new(),
            frames: FrameLoop::new(),
            errors: ErrorState::default(),
            open: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn scene(&self) -> &PanoScene {
        &self.scene
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn minimap(&self) -> &MiniMapSync<M> {
        &self.minimap
    }

    pub fn frames(&self) -> &FrameLoop {
        &self.frames
    }

    pub fn current_station(&self) -> Option<&SharedStation> {
        self.scene.station()
    }

    pub fn heading_degrees(&self) -> f64 {
        self.scene.camera.heading_degrees()
    }

    pub fn fov_degrees(&self) -> f32 {
        self.scene.camera.fovy_deg
    }

    pub fn last_error(&self) -> Option<&PanoError> {
        self.errors.last()
    }

    pub fn clear_error(&mut self) {
        self.errors.clear();
    }

    /// Station point features for the mini-map and main-map lookups.
    pub fn set_station_points(&mut self, points: &FeatureCollection) {
        self.minimap.set_features(points, &self.config.id_property);
    }

    /// Activate the mini-map dot of station `id`.
    pub fn minimap_click(&self, id: &StationId) -> Option<Command> {
        let point = self.minimap.point(id)?;
        Some(if self.open {
            point.on_activate()
        } else {
            Command::Open(point.id)
        })
    }

    // ---------------- navigation steps ----------------

    pub fn begin_navigation(
        &mut self,
        id: StationId,
        opening: bool,
    ) -> Result<NavTicket, PanoError> {
        if !opening && !self.open {
            return Err(PanoError::NotOpen);
        }
        Ok(self.walker.begin(id, opening && !self.open))
    }

    /// Apply fetched metadata. On success the station is current, its markers
    /// are built and the texture to load next is returned.
    pub fn finish_metadata(
        &mut self,
        ticket: NavTicket,
        fetched: Result<Station, PanoError>,
    ) -> Result<Option<PendingTexture>, PanoError> {
        if !self.walker.complete(&ticket) {
            return Ok(None);
        }
        let station = match fetched {
            Ok(s) => s,
            Err(e) => {
                self.fail(e.clone());
                return Err(e);
            }
        };
        let opening = ticket.opening && !self.open;
        let pending = PendingTexture {
            station: station.id.clone(),
            image: station.image.clone(),
            fix_heading: station.fix_heading,
        };
        let index = self.frames.current_index();
        let shown = self.scene.show_station(station, &mut self.renderer, opening);
        self.errors.clear();
        if opening {
            self.open = true;
            self.frames.start();
            log::info!("[session] opened at {}", shown.id);
            self.bus.emit(index, ViewerEvent::Opened(shown.id.clone()));
        } else {
            log::info!("[session] now at {}", shown.id);
        }
        self.bus.emit(index, ViewerEvent::StationChanged(shown.id.clone()));
        if let Some(h) = self.scene.take_heading_change() {
            self.bus.emit(index, ViewerEvent::HeadingChanged(h));
        }
        Ok(Some(pending))
    }

    /// Swap in a decoded panorama. A failed decode keeps the old texture.
    pub fn finish_texture(
        &mut self,
        pending: PendingTexture,
        decoded: Result<PanoramaImage, PanoError>,
    ) -> Result<(), PanoError> {
        if !self.open {
            return Ok(());
        }
        let image = match decoded {
            Ok(img) => img,
            Err(e) => {
                if self.scene.station_id() == Some(&pending.station) {
                    self.fail(e.clone());
                    return Err(e);
                }
                log::debug!("[session] ignoring decode failure for stale {}", pending.station);
                return Ok(());
            }
        };
        match self.scene.swap_texture(
            &pending.station,
            pending.fix_heading,
            &image,
            &mut self.renderer,
        ) {
            Ok(true) => {
                let index = self.frames.current_index();
                self.bus
                    .emit(index, ViewerEvent::TextureSwapped(pending.station));
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) => {
                self.fail(e.clone());
                Err(e)
            }
        }
    }

    fn fail(&mut self, err: PanoError) {
        let index = self.frames.current_index();
        self.errors.record(err.clone());
        self.bus.emit(index, ViewerEvent::NavigationFailed(err));
    }

    // ---------------- per-frame ----------------

    /// Run one frame if the loop is running; `None` once it has stopped.
    /// Returns the events dispatched during the frame.
    pub fn frame(&mut self) -> Option<Vec<ViewerEvent>> {
        let frame = self.frames.tick()?;
        self.render_at(frame.index);
        Some(self.pump_events())
    }

    fn render_at(&mut self, index: u64) {
        self.scene.apply_pending_look();
        if let Some(h) = self.scene.take_heading_change() {
            self.bus.emit(index, ViewerEvent::HeadingChanged(h));
        }
        let view = self.scene.prepare_view();
        if let Err(e) = self.renderer.draw(&view) {
            log::warn!("[render] {}", e);
        }
    }

    /// Route queued events to the mini-map and hand them to the caller.
    pub fn pump_events(&mut self) -> Vec<ViewerEvent> {
        let events = self.bus.drain();
        let mut out = Vec::with_capacity(events.len());
        for ev in events {
            match &ev.event {
                ViewerEvent::Opened(_) => {
                    if let Some(st) = self.scene.station() {
                        self.minimap.on_heading_changed(st.heading);
                    }
                }
                ViewerEvent::StationChanged(id) => {
                    if let Some(st) = self.scene.station().filter(|s| &s.id == id).cloned() {
                        self.minimap.on_station_changed(&st);
                    }
                }
                ViewerEvent::HeadingChanged(h) => self.minimap.on_heading_changed(*h),
                ViewerEvent::TextureSwapped(_)
                | ViewerEvent::NavigationFailed(_)
                | ViewerEvent::Closed => {}
            }
            out.push(ev.event);
        }
        out
    }

    // ---------------- input ----------------

    pub fn pointer_down(&mut self, px: Vec2, primary: bool) {
        if self.open {
            self.scene.pointer_down(px, primary);
        }
    }

    pub fn pointer_move(&mut self, px: Vec2) {
        if self.open {
            self.scene.pointer_move(px);
        }
    }

    pub fn pointer_up(&mut self, px: Vec2) -> Option<Command> {
        if !self.open {
            return None;
        }
        let cmd = self.scene.pointer_up(px);
        if let Some(c) = &cmd {
            log::debug!("[input] marker click -> {:?}", c);
        }
        cmd
    }

    /// Wheel zoom; ignored while closed or when the pointer is over the mini-map.
    pub fn wheel(&mut self, delta_y: f32, over_minimap: bool) -> Option<f32> {
        if !self.open || over_minimap {
            return None;
        }
        Some(self.scene.zoom(delta_y))
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.scene.resize(width, height);
        self.renderer.resize(width.max(1), height.max(1));
    }

    /// Device pixels per CSS pixel, so drags feel the same on any screen.
    pub fn set_pixel_ratio(&mut self, ratio: f32) {
        self.scene.set_pixel_ratio(ratio);
    }

    /// Tear the scene down and stop the frame loop. Navigations still in
    /// flight are dropped when they complete.
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.scene.teardown(&mut self.renderer);
        self.walker.invalidate();
        self.minimap.reset();
        self.frames.stop();
        self.open = false;
        let index = self.frames.current_index();
        self.bus.emit(index, ViewerEvent::Closed);
        log::info!("[session] closed");
    }
}
