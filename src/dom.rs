use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

use crate::input::{self, CssRect};

#[inline]
pub fn window_document() -> Option<web::Document> {
    web::window().and_then(|w| w.document())
}

pub fn element_by_id(document: &web::Document, id: &str) -> anyhow::Result<web::HtmlElement> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| anyhow::anyhow!("missing #{}", id))?
        .dyn_into::<web::HtmlElement>()
        .map_err(|e| anyhow::anyhow!(format!("#{} is not an HtmlElement: {:?}", id, e)))
}

pub fn css_rect(el: &web::Element) -> CssRect {
    let r = el.get_bounding_client_rect();
    CssRect {
        left: r.left() as f32,
        top: r.top() as f32,
        width: r.width() as f32,
        height: r.height() as f32,
    }
}

/// Set an element's CSS `display`; an empty value restores the stylesheet's.
pub fn set_display(document: &web::Document, id: &str, display: &str) {
    let Some(el) = document.get_element_by_id(id) else {
        log::debug!("[dom] no #{} to toggle", id);
        return;
    };
    if let Ok(html) = el.dyn_into::<web::HtmlElement>() {
        _ = html.style().set_property("display", display);
    }
}

pub fn set_text(document: &web::Document, id: &str, text: &str) {
    if let Some(el) = document.get_element_by_id(id) {
        el.set_text_content(Some(text));
    }
}

pub fn device_pixel_ratio() -> f64 {
    web::window().map(|w| w.device_pixel_ratio()).unwrap_or(1.0)
}

pub fn sync_canvas_backing_size(canvas: &web::HtmlCanvasElement) -> (u32, u32) {
    let (w, h) = input::backing_size(css_rect(canvas), device_pixel_ratio());
    if canvas.width() != w || canvas.height() != h {
        canvas.set_width(w);
        canvas.set_height(h);
    }
    (w, h)
}

/// An attached DOM listener; dropping it detaches the callback.
pub struct ListenerGuard {
    target: web::EventTarget,
    kind: &'static str,
    closure: Closure<dyn FnMut(web::Event)>,
}

impl ListenerGuard {
    pub fn attach(
        target: &web::EventTarget,
        kind: &'static str,
        handler: impl FnMut(web::Event) + 'static,
    ) -> anyhow::Result<Self> {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web::Event)>);
        target
            .add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())
            .map_err(|e| anyhow::anyhow!(format!("add {} listener: {:?}", kind, e)))?;
        Ok(Self {
            target: target.clone(),
            kind,
            closure,
        })
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        _ = self
            .target
            .remove_event_listener_with_callback(self.kind, self.closure.as_ref().unchecked_ref());
    }
}

/// Click listener on an element by id; `None` when the element is missing.
pub fn on_click(
    document: &web::Document,
    element_id: &str,
    mut handler: impl FnMut() + 'static,
) -> Option<ListenerGuard> {
    let el = document.get_element_by_id(element_id)?;
    match ListenerGuard::attach(&el, "click", move |_| handler()) {
        Ok(g) => Some(g),
        Err(e) => {
            log::warn!("[dom] {:?}", e);
            None
        }
    }
}
