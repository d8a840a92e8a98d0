//! Thin bindings to the page's maplibre-gl and the mini-map built on them.

use js_sys::{Function, Promise, Reflect};
use pano_core::{FeatureCollection, GeoBounds, GeoPoint, MiniMap, StationId, ViewerConfig};
use serde_json::json;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

pub const LINES_LAYER: &str = "street-view";
pub const LINES_SOURCE: &str = "lines-street-view";
pub const POINTS_SOURCE: &str = "points-street-view";
const MINI_POINTS: &str = "points";
const MINI_SELECTED: &str = "selected";

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = maplibregl, js_name = Map)]
    #[derive(Clone, Debug)]
    pub type Map;

    #[wasm_bindgen(constructor, catch, js_namespace = maplibregl, js_class = "Map")]
    pub fn new(options: &JsValue) -> Result<Map, JsValue>;

    #[wasm_bindgen(method, catch, js_name = setCenter)]
    pub fn set_center(this: &Map, center: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = fitBounds)]
    pub fn fit_bounds(this: &Map, bounds: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = setFilter)]
    pub fn set_filter(this: &Map, layer: &str, filter: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = setLayoutProperty)]
    pub fn set_layout_property(
        this: &Map,
        layer: &str,
        name: &str,
        value: &JsValue,
    ) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = addSource)]
    pub fn add_source(this: &Map, id: &str, source: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, js_name = getSource)]
    pub fn get_source(this: &Map, id: &str) -> JsValue;

    #[wasm_bindgen(method, catch, js_name = addLayer)]
    pub fn add_layer(this: &Map, layer: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, js_name = getLayer)]
    pub fn get_layer(this: &Map, id: &str) -> JsValue;

    #[wasm_bindgen(method, catch, js_name = removeLayer)]
    pub fn remove_layer(this: &Map, id: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, js_name = on)]
    pub fn on_layer(this: &Map, event: &str, layer: &str, handler: &Function);

    #[wasm_bindgen(method, js_name = off)]
    pub fn off_layer(this: &Map, event: &str, layer: &str, handler: &Function);

    #[wasm_bindgen(method, js_name = once)]
    pub fn once(this: &Map, event: &str) -> Promise;

    #[wasm_bindgen(method, js_name = loaded)]
    pub fn loaded(this: &Map) -> bool;

    #[wasm_bindgen(method, js_name = loadImage)]
    pub fn load_image(this: &Map, url: &str) -> Promise;

    #[wasm_bindgen(method, catch, js_name = addImage)]
    pub fn add_image(this: &Map, name: &str, image: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, js_name = getCanvas)]
    pub fn get_canvas(this: &Map) -> web::HtmlCanvasElement;

    #[wasm_bindgen(method)]
    pub fn resize(this: &Map);
}

pub fn to_js(value: &serde_json::Value) -> JsValue {
    js_sys::JSON::parse(&value.to_string()).unwrap_or(JsValue::NULL)
}

fn warn_on_err(what: &str, r: Result<JsValue, JsValue>) {
    if let Err(e) = r {
        log::warn!("[maplibre] {} failed: {:?}", what, e);
    }
}

/// Filter expression matching one station by its id property.
pub fn selection_filter(id_property: &str, id: &StationId) -> serde_json::Value {
    json!(["==", ["to-string", ["get", id_property]], id.as_str()])
}

/// `[lng, lat]` and `properties[id_property]` of the first feature in a layer event.
pub fn event_lng_lat(ev: &JsValue) -> Option<GeoPoint> {
    let ll = Reflect::get(ev, &"lngLat".into()).ok()?;
    let lng = Reflect::get(&ll, &"lng".into()).ok()?.as_f64()?;
    let lat = Reflect::get(&ll, &"lat".into()).ok()?.as_f64()?;
    Some(GeoPoint::new(lat, lng))
}

pub fn event_station_id(ev: &JsValue, id_property: &str) -> Option<StationId> {
    let features = Reflect::get(ev, &"features".into()).ok()?;
    let first = Reflect::get_u32(&features, 0).ok()?;
    let props = Reflect::get(&first, &"properties".into()).ok()?;
    let v = Reflect::get(&props, &id_property.into()).ok()?;
    if let Some(s) = v.as_string() {
        return Some(StationId(s));
    }
    v.as_f64().map(|n| StationId(format!("{}", n)))
}

/// Register the station sources on the main map.
pub fn add_main_sources(map: &Map, points_json: &str, lines_json: &str) {
    let parse = |s: &str| js_sys::JSON::parse(s).unwrap_or(JsValue::NULL);
    if map.get_source(POINTS_SOURCE).is_undefined() {
        let src = to_js(&json!({ "type": "geojson" }));
        _ = Reflect::set(&src, &"data".into(), &parse(points_json));
        warn_on_err("addSource points", map.add_source(POINTS_SOURCE, &src));
    }
    if map.get_source(LINES_SOURCE).is_undefined() {
        let src = to_js(&json!({ "type": "geojson" }));
        _ = Reflect::set(&src, &"data".into(), &parse(lines_json));
        warn_on_err("addSource lines", map.add_source(LINES_SOURCE, &src));
    }
}

pub fn show_lines(map: &Map) {
    if !map.get_layer(LINES_LAYER).is_undefined() {
        return;
    }
    let layer = json!({
        "id": LINES_LAYER,
        "type": "line",
        "source": LINES_SOURCE,
        "layout": { "line-join": "round", "line-cap": "round" },
        "paint": { "line-color": "#0d6efd", "line-width": 4 }
    });
    warn_on_err("addLayer lines", map.add_layer(&to_js(&layer)));
}

pub fn hide_lines(map: &Map) {
    if !map.get_layer(LINES_LAYER).is_undefined() {
        warn_on_err("removeLayer lines", map.remove_layer(LINES_LAYER));
    }
}

pub fn set_cursor(map: &Map, cursor: &str) {
    _ = map.get_canvas().style().set_property("cursor", cursor);
}

/// Mini-map driven by the viewer session.
pub struct MapLibreMiniMap {
    map: Map,
    id_property: String,
}

impl MapLibreMiniMap {
    /// Create the mini-map in its container and wait for the style to load.
    pub async fn create(
        config: &ViewerConfig,
        points: &FeatureCollection,
        points_json: &str,
    ) -> anyhow::Result<Self> {
        let center = points.centroid().unwrap_or(GeoPoint::new(0.0, 0.0));
        let options = json!({
            "container": config.minimap_id,
            "style": config.minimap_style_url,
            "center": [center.lon, center.lat],
            "zoom": config.minimap_zoom,
        });
        let map = Map::new(&to_js(&options))
            .map_err(|e| anyhow::anyhow!(format!("mini-map: {:?}", e)))?;
        if !map.loaded() {
            _ = JsFuture::from(map.once("load")).await;
        }

        let data = js_sys::JSON::parse(points_json)
            .map_err(|e| anyhow::anyhow!(format!("points geojson: {:?}", e)))?;
        for (source, image, url) in [
            (MINI_POINTS, "point", config.minimap_point_icon_url.as_str()),
            (MINI_SELECTED, "point-selected", config.minimap_selected_icon_url.as_str()),
        ] {
            match JsFuture::from(map.load_image(url)).await {
                Ok(img) => {
                    let data = Reflect::get(&img, &"data".into()).unwrap_or(JsValue::NULL);
                    warn_on_err("addImage", map.add_image(image, &data));
                }
                Err(e) => log::warn!("[maplibre] loadImage {} failed: {:?}", url, e),
            }
            let src = to_js(&json!({ "type": "geojson" }));
            _ = Reflect::set(&src, &"data".into(), &data);
            warn_on_err("addSource", map.add_source(source, &src));
        }
        let points_layer = json!({
            "id": MINI_POINTS,
            "type": "symbol",
            "source": MINI_POINTS,
            "layout": { "icon-image": "point" }
        });
        warn_on_err("addLayer points", map.add_layer(&to_js(&points_layer)));
        let selected_layer = json!({
            "id": MINI_SELECTED,
            "type": "symbol",
            "source": MINI_SELECTED,
            "filter": ["==", ["to-string", ["get", config.id_property]], ""],
            "layout": { "icon-image": "point-selected", "icon-rotation-alignment": "map" }
        });
        warn_on_err("addLayer selected", map.add_layer(&to_js(&selected_layer)));

        Ok(Self {
            map,
            id_property: config.id_property.clone(),
        })
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    /// Point-layer click handler; the caller keeps the closure alive.
    pub fn on_point_click(&self, handler: &Function) {
        self.map.on_layer("click", MINI_POINTS, handler);
    }
}

impl MiniMap for MapLibreMiniMap {
    fn set_selected_station(&mut self, id: &StationId) {
        let filter = selection_filter(&self.id_property, id);
        warn_on_err("setFilter", self.map.set_filter(MINI_SELECTED, &to_js(&filter)));
    }

    fn set_center(&mut self, center: GeoPoint) {
        warn_on_err(
            "setCenter",
            self.map.set_center(&to_js(&json!([center.lon, center.lat]))),
        );
    }

    fn fit_bounds(&mut self, b: GeoBounds) {
        let bounds = json!([[b.west, b.south], [b.east, b.north]]);
        warn_on_err("fitBounds", self.map.fit_bounds(&to_js(&bounds)));
    }

    fn set_icon_rotation(&mut self, degrees: f64) {
        warn_on_err(
            "setLayoutProperty",
            self.map
                .set_layout_property(MINI_SELECTED, "icon-rotate", &JsValue::from_f64(degrees)),
        );
    }
}
