#![cfg(target_arch = "wasm32")]
use std::cell::RefCell;
use std::rc::Rc;

use pano_core::{
    navigation, Command, FeatureCollection, LayoutMode, Session, StreetViewTool, ViewerConfig,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

use crate::dom::ListenerGuard;
use crate::fetch::{BrowserImageLoader, HttpStationSource};
use crate::maplibre::MapLibreMiniMap;
use crate::render::GpuRenderer;

mod constants;
mod dom;
mod events;
mod fetch;
mod frame;
mod input;
mod maplibre;
mod render;

type WebSession = Session<GpuRenderer, MapLibreMiniMap>;
type MapHandler = Closure<dyn FnMut(JsValue)>;

/// Everything one street-view tool on the page owns.
pub struct WebViewer {
    config: ViewerConfig,
    document: web::Document,
    canvas: web::HtmlCanvasElement,
    session: RefCell<WebSession>,
    source: HttpStationSource,
    loader: BrowserImageLoader,
    tool: RefCell<StreetViewTool>,
    points: FeatureCollection,
    main_map: maplibre::Map,
    frames: frame::FrameDriver,
    buttons: RefCell<Vec<ListenerGuard>>,
    /// Canvas and window input; attached only while the panorama is open.
    input: RefCell<Vec<ListenerGuard>>,
    main_map_handlers: RefCell<Vec<(&'static str, MapHandler)>>,
}

impl WebViewer {
    /// Carry out a navigation command in the background.
    fn run(self: &Rc<Self>, command: Command) {
        let viewer = self.clone();
        spawn_local(async move {
            let result =
                navigation::execute(&viewer.session, &viewer.source, &viewer.loader, command).await;
            if let Err(e) = result {
                log::warn!("[nav] {}", e);
            }
            viewer.settle();
        });
    }

    /// Deliver queued events and keep frames coming while the viewer is open.
    fn settle(self: &Rc<Self>) {
        let events = self.session.borrow_mut().pump_events();
        frame::handle_events(self, events);
        self.frames.ensure_running(self);
    }

    fn close(self: &Rc<Self>) {
        self.session.borrow_mut().close();
        self.settle();
    }

    fn attach_input(self: &Rc<Self>) {
        if !self.input.borrow().is_empty() {
            return;
        }
        match events::wire_viewer_input(self) {
            Ok(guards) => *self.input.borrow_mut() = guards,
            Err(e) => log::warn!("[viewer] input wiring: {:?}", e),
        }
    }

    fn detach_input(&self) {
        let detached = std::mem::take(&mut *self.input.borrow_mut());
        log::debug!("[viewer] detached {} input listener(s)", detached.len());
    }

    fn apply_layout(&self) {
        let panorama = self.tool.borrow().layout() == LayoutMode::Panorama;
        let doc = &self.document;
        for id in &self.config.full_map_elements {
            dom::set_display(doc, id, if panorama { "none" } else { "" });
        }
        let (block, flex) = if panorama {
            ("block", "flex")
        } else {
            ("none", "none")
        };
        dom::set_display(doc, &self.config.container_id, block);
        dom::set_display(doc, &self.config.minimap_id, block);
        dom::set_display(doc, &self.config.close_button_id, flex);
        if panorama {
            self.sync_size();
            self.session.borrow().minimap().map().map().resize();
        }
    }

    fn sync_size(&self) {
        let (w, h) = dom::sync_canvas_backing_size(&self.canvas);
        let mut session = self.session.borrow_mut();
        session.resize(w, h);
        session.set_pixel_ratio(dom::device_pixel_ratio() as f32);
    }

    fn show_status(&self) {
        let message = self
            .session
            .borrow()
            .last_error()
            .map(|e| e.to_string())
            .unwrap_or_default();
        dom::set_text(&self.document, &self.config.status_id, &message);
    }

    fn toggle_tool(self: &Rc<Self>) {
        let active = self.tool.borrow_mut().toggle();
        if let Some(button) = self.document.get_element_by_id(&self.config.toggle_button_id) {
            _ = button.set_attribute("data-active", if active { "true" } else { "false" });
        }
        if active {
            maplibre::show_lines(&self.main_map);
            for (event, handler) in self.main_map_handlers.borrow().iter() {
                self.main_map
                    .on_layer(event, maplibre::LINES_LAYER, handler.as_ref().unchecked_ref());
            }
        } else {
            for (event, handler) in self.main_map_handlers.borrow().iter() {
                self.main_map
                    .off_layer(event, maplibre::LINES_LAYER, handler.as_ref().unchecked_ref());
            }
            maplibre::hide_lines(&self.main_map);
            maplibre::set_cursor(&self.main_map, "");
            if self.session.borrow().is_open() {
                self.close();
            } else {
                self.apply_layout();
            }
        }
    }

    fn main_map_click(self: &Rc<Self>, ev: &JsValue) {
        let Some(at) = maplibre::event_lng_lat(ev) else {
            return;
        };
        let open = self.session.borrow().is_open();
        let picked = self.tool.borrow().main_map_click(
            at,
            &self.points,
            &self.config.id_property,
            open,
        );
        match picked {
            Ok(Some(command)) => self.run(command),
            Ok(None) => {}
            Err(e) => log::warn!("[tool] {}", e),
        }
    }

    fn minimap_click(self: &Rc<Self>, ev: &JsValue) {
        let Some(id) = maplibre::event_station_id(ev, &self.config.id_property) else {
            return;
        };
        let command = self.session.borrow().minimap_click(&id);
        match command {
            Some(command) => self.run(command),
            None => log::debug!("[minimap] {} is not a known station", id),
        }
    }
}

fn main_map_handlers(viewer: &Rc<WebViewer>) -> Vec<(&'static str, MapHandler)> {
    let weak = Rc::downgrade(viewer);
    let click = Closure::wrap(Box::new(move |ev: JsValue| {
        if let Some(v) = weak.upgrade() {
            v.main_map_click(&ev);
        }
    }) as Box<dyn FnMut(JsValue)>);
    let map = viewer.main_map.clone();
    let enter = Closure::wrap(Box::new(move |_: JsValue| {
        maplibre::set_cursor(&map, "pointer");
    }) as Box<dyn FnMut(JsValue)>);
    let map = viewer.main_map.clone();
    let leave = Closure::wrap(Box::new(move |_: JsValue| {
        maplibre::set_cursor(&map, "");
    }) as Box<dyn FnMut(JsValue)>);
    vec![("click", click), ("mouseenter", enter), ("mouseleave", leave)]
}

fn wire_buttons(viewer: &Rc<WebViewer>) -> Vec<ListenerGuard> {
    let mut guards = Vec::new();
    let v = viewer.clone();
    guards.extend(dom::on_click(
        &viewer.document,
        &viewer.config.toggle_button_id,
        move || v.toggle_tool(),
    ));
    let v = viewer.clone();
    guards.extend(dom::on_click(
        &viewer.document,
        &viewer.config.close_button_id,
        move || v.close(),
    ));
    guards
}

async fn load_marker_texture(
    session: &RefCell<WebSession>,
    loader: &BrowserImageLoader,
    url: &str,
) {
    match loader.decode_url(url).await {
        Ok(image) => session.borrow_mut().renderer_mut().set_marker_texture(&image),
        Err(e) => log::warn!("[viewer] marker texture: {}", e),
    }
}

async fn attach(map: JsValue, config_json: Option<String>) -> anyhow::Result<()> {
    let config = match config_json {
        Some(json) => ViewerConfig::from_json(&json)?,
        None => ViewerConfig::default(),
    };
    let document = dom::window_document().ok_or_else(|| anyhow::anyhow!("no document"))?;
    let canvas: web::HtmlCanvasElement = dom::element_by_id(&document, &config.canvas_id)?
        .dyn_into::<web::HtmlCanvasElement>()
        .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))?;
    let main_map: maplibre::Map = map.unchecked_into();

    let points_json = fetch::fetch_text(&config.points_url).await?;
    let points = FeatureCollection::from_json(&points_json)?;
    let lines_json = fetch::fetch_text(&config.lines_url).await?;
    maplibre::add_main_sources(&main_map, &points_json, &lines_json);
    log::info!("[viewer] {} station points", points.features.len());

    dom::sync_canvas_backing_size(&canvas);
    let renderer = GpuRenderer::new(&canvas).await?;
    let minimap = MapLibreMiniMap::create(&config, &points, &points_json).await?;
    let mut session = Session::new(config.clone(), renderer, minimap);
    session.set_station_points(&points);
    session.resize(canvas.width(), canvas.height());
    session.set_pixel_ratio(dom::device_pixel_ratio() as f32);

    let viewer = Rc::new(WebViewer {
        source: HttpStationSource::new(config.clone()),
        loader: BrowserImageLoader::new(config.clone()),
        config,
        document,
        canvas,
        session: RefCell::new(session),
        tool: RefCell::new(StreetViewTool::new()),
        points,
        main_map,
        frames: frame::FrameDriver::default(),
        buttons: RefCell::new(Vec::new()),
        input: RefCell::new(Vec::new()),
        main_map_handlers: RefCell::new(Vec::new()),
    });
    load_marker_texture(&viewer.session, &viewer.loader, &viewer.config.marker_texture_url).await;

    *viewer.main_map_handlers.borrow_mut() = main_map_handlers(&viewer);
    *viewer.buttons.borrow_mut() = wire_buttons(&viewer);

    let v = viewer.clone();
    let minimap_click = Closure::wrap(Box::new(move |ev: JsValue| {
        v.minimap_click(&ev);
    }) as Box<dyn FnMut(JsValue)>);
    viewer
        .session
        .borrow()
        .minimap()
        .map()
        .on_point_click(minimap_click.as_ref().unchecked_ref());
    minimap_click.forget();

    viewer.apply_layout();
    log::info!("[viewer] street-view tool attached");
    Ok(())
}

/// Attach the street-view tool to a maplibre map already on the page.
#[wasm_bindgen]
pub async fn attach_street_view(map: JsValue, config_json: Option<String>) -> Result<(), JsValue> {
    attach(map, config_json).await.map_err(|e| {
        log::error!("attach error: {:?}", e);
        JsValue::from_str(&format!("{:#}", e))
    })
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("pano-web starting");
    Ok(())
}
