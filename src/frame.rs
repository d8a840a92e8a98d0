use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pano_core::ViewerEvent;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

use crate::WebViewer;

type Tick = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// `requestAnimationFrame` driver for a session's frame loop.
///
/// A callback is only re-requested while the loop is running, so once the
/// viewer closes nothing stays scheduled.
#[derive(Default)]
pub struct FrameDriver {
    tick: Tick,
    scheduled: Rc<Cell<bool>>,
}

impl FrameDriver {
    pub fn ensure_running(&self, viewer: &Rc<WebViewer>) {
        if self.scheduled.get() || !viewer.session.borrow().frames().is_running() {
            return;
        }
        if self.tick.borrow().is_none() {
            let tick = self.tick.clone();
            let scheduled = self.scheduled.clone();
            let viewer = viewer.clone();
            *self.tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
                // borrow released before events reach the page
                let events = viewer.session.borrow_mut().frame();
                match events {
                    Some(events) => {
                        handle_events(&viewer, events);
                        if !request_frame(&tick) {
                            scheduled.set(false);
                        }
                    }
                    None => {
                        log::debug!("[frame] loop stopped");
                        scheduled.set(false);
                    }
                }
            }) as Box<dyn FnMut()>));
        }
        self.scheduled.set(request_frame(&self.tick));
    }
}

fn request_frame(tick: &Tick) -> bool {
    let Some(window) = web::window() else {
        return false;
    };
    let tick = tick.borrow();
    let Some(cb) = tick.as_ref() else {
        return false;
    };
    window
        .request_animation_frame(cb.as_ref().unchecked_ref())
        .is_ok()
}

/// Page-side reactions to session events.
pub fn handle_events(viewer: &Rc<WebViewer>, events: Vec<ViewerEvent>) {
    for ev in events {
        match ev {
            ViewerEvent::Opened(id) => {
                log::info!("[viewer] showing panorama layout for {}", id);
                viewer.tool.borrow_mut().panorama_opened();
                viewer.apply_layout();
                viewer.attach_input();
            }
            ViewerEvent::StationChanged(_) | ViewerEvent::NavigationFailed(_) => {
                viewer.show_status();
            }
            ViewerEvent::Closed => {
                viewer.detach_input();
                viewer.tool.borrow_mut().panorama_closed();
                viewer.apply_layout();
                viewer.show_status();
            }
            ViewerEvent::HeadingChanged(_) | ViewerEvent::TextureSwapped(_) => {}
        }
    }
}
