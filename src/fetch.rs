use gloo_net::http::Request;
use pano_core::{
    parse_station, FetchFailure, PanoError, PanoramaImage, PanoramaLoader,
    Station, StationId, StationSource, ViewerConfig,
};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

use crate::constants::MAX_TEXTURE_WIDTH;

/// Station documents served over HTTP.
pub struct HttpStationSource {
    config: ViewerConfig,
}

impl HttpStationSource {
    pub fn new(config: ViewerConfig) -> Self {
        Self { config }
    }
}

impl StationSource for HttpStationSource {
    async fn fetch_station(&self, id: &StationId) -> Result<Station, PanoError> {
        let url = self.config.metadata_url(id);
        let resp = Request::get(&url)
            .send()
            .await
            .map_err(|e| PanoError::metadata(id, FetchFailure::Network, e.to_string()))?;
        if !resp.ok() {
            let kind = if resp.status() == 404 {
                FetchFailure::NotFound
            } else {
                FetchFailure::Network
            };
            return Err(PanoError::metadata(id, kind, format!("HTTP {}", resp.status())));
        }
        let text = resp
            .text()
            .await
            .map_err(|e| PanoError::metadata(id, FetchFailure::Network, e.to_string()))?;
        parse_station(id, &text)
    }
}

/// GET a text resource, failing on non-2xx.
pub async fn fetch_text(url: &str) -> anyhow::Result<String> {
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("GET {}: {}", url, e))?;
    if !resp.ok() {
        anyhow::bail!("GET {}: HTTP {}", url, resp.status());
    }
    resp.text()
        .await
        .map_err(|e| anyhow::anyhow!("GET {}: {}", url, e))
}

/// Decodes images with the browser's own decoder and reads the pixels back
/// through a 2d canvas.
pub struct BrowserImageLoader {
    config: ViewerConfig,
}

impl BrowserImageLoader {
    pub fn new(config: ViewerConfig) -> Self {
        Self { config }
    }

    pub async fn decode_url(&self, url: &str) -> Result<PanoramaImage, PanoError> {
        let fail = |detail: String| PanoError::texture(url, detail);
        let img = web::HtmlImageElement::new().map_err(|e| fail(format!("{:?}", e)))?;
        img.set_cross_origin(Some("anonymous"));
        img.set_src(url);
        JsFuture::from(img.decode())
            .await
            .map_err(|e| fail(format!("decode: {:?}", e)))?;

        let (w, h) = fit_width(img.natural_width(), img.natural_height(), MAX_TEXTURE_WIDTH);
        if w == 0 || h == 0 {
            return Err(fail("empty image".to_string()));
        }
        let document = crate::dom::window_document().ok_or_else(|| fail("no document".into()))?;
        let canvas = document
            .create_element("canvas")
            .map_err(|e| fail(format!("{:?}", e)))?
            .dyn_into::<web::HtmlCanvasElement>()
            .map_err(|e| fail(format!("{:?}", e)))?;
        canvas.set_width(w);
        canvas.set_height(h);
        let ctx = canvas
            .get_context("2d")
            .map_err(|e| fail(format!("{:?}", e)))?
            .ok_or_else(|| fail("no 2d context".into()))?
            .dyn_into::<web::CanvasRenderingContext2d>()
            .map_err(|e| fail(format!("{:?}", e)))?;
        ctx.draw_image_with_html_image_element_and_dw_and_dh(&img, 0.0, 0.0, w as f64, h as f64)
            .map_err(|e| fail(format!("draw: {:?}", e)))?;
        let data = ctx
            .get_image_data(0.0, 0.0, w as f64, h as f64)
            .map_err(|e| fail(format!("read back: {:?}", e)))?;
        PanoramaImage::new(w, h, data.data().0).map_err(|e| fail(e.to_string()))
    }
}

impl PanoramaLoader for BrowserImageLoader {
    async fn load_panorama(&self, image: &str) -> Result<PanoramaImage, PanoError> {
        let url = self.config.image_url(image);
        log::info!("[fetch] panorama {}", url);
        self.decode_url(&url).await
    }
}

/// Scale an image down to fit the GPU texture limit, keeping its aspect.
fn fit_width(w: u32, h: u32, max_w: u32) -> (u32, u32) {
    if w <= max_w {
        return (w, h);
    }
    let scaled_h = (h as u64 * max_w as u64 / w.max(1) as u64) as u32;
    (max_w, scaled_h.max(1))
}
