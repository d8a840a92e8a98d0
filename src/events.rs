use std::rc::Rc;

use glam::Vec2;
use wasm_bindgen::JsCast;
use web_sys as web;

use crate::dom::{self, ListenerGuard};
use crate::input;
use crate::WebViewer;

fn canvas_px(viewer: &WebViewer, ev: &web::MouseEvent) -> Vec2 {
    let client = Vec2::new(ev.client_x() as f32, ev.client_y() as f32);
    input::client_to_canvas_px(
        client,
        dom::css_rect(&viewer.canvas),
        viewer.canvas.width(),
        viewer.canvas.height(),
    )
}

/// Pointer, wheel and resize handling for the panorama canvas.
pub fn wire_viewer_input(viewer: &Rc<WebViewer>) -> anyhow::Result<Vec<ListenerGuard>> {
    let canvas: &web::EventTarget = viewer.canvas.as_ref();
    let mut guards = Vec::with_capacity(5);

    let v = viewer.clone();
    guards.push(ListenerGuard::attach(canvas, "pointerdown", move |ev| {
        let Some(pe) = ev.dyn_ref::<web::PointerEvent>() else {
            return;
        };
        let primary = input::is_primary_press(pe.is_primary(), pe.button());
        if primary {
            _ = v.canvas.set_pointer_capture(pe.pointer_id());
        }
        let px = canvas_px(&v, pe);
        v.session.borrow_mut().pointer_down(px, primary);
    })?);

    let v = viewer.clone();
    guards.push(ListenerGuard::attach(canvas, "pointermove", move |ev| {
        if let Some(pe) = ev.dyn_ref::<web::PointerEvent>() {
            let px = canvas_px(&v, pe);
            v.session.borrow_mut().pointer_move(px);
        }
    })?);

    let v = viewer.clone();
    guards.push(ListenerGuard::attach(canvas, "pointerup", move |ev| {
        let Some(pe) = ev.dyn_ref::<web::PointerEvent>() else {
            return;
        };
        _ = v.canvas.release_pointer_capture(pe.pointer_id());
        let px = canvas_px(&v, pe);
        let command = v.session.borrow_mut().pointer_up(px);
        if let Some(command) = command {
            v.run(command);
        }
    })?);

    let container = dom::element_by_id(&viewer.document, &viewer.config.container_id)?;
    let v = viewer.clone();
    guards.push(ListenerGuard::attach(container.as_ref(), "wheel", move |ev| {
        let Some(we) = ev.dyn_ref::<web::WheelEvent>() else {
            return;
        };
        let client = Vec2::new(we.client_x() as f32, we.client_y() as f32);
        let over_minimap = v
            .document
            .get_element_by_id(&v.config.minimap_id)
            .map(|el| dom::css_rect(&el).contains(client))
            .unwrap_or(false);
        let delta = input::wheel_delta_px(we.delta_y(), we.delta_mode());
        let zoomed = v.session.borrow_mut().wheel(delta, over_minimap);
        if let Some(fov) = zoomed {
            log::debug!("[input] fov {:.1}", fov);
            we.prevent_default();
        }
    })?);

    let window = web::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let v = viewer.clone();
    guards.push(ListenerGuard::attach(window.as_ref(), "resize", move |_| {
        v.sync_size();
    })?);

    Ok(guards)
}
