use crate::error::PanoError;
use crate::station::StationId;

/// Things that happened inside the viewer, drained once per frame.
///
/// The navigation walker and the camera only emit; the session routes the
/// events to the mini-map and the UI so those parts never call each other.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    Opened(StationId),
    /// A new station became current and its markers were rebuilt.
    StationChanged(StationId),
    /// The view direction changed; degrees clockwise from north.
    HeadingChanged(f64),
    TextureSwapped(StationId),
    NavigationFailed(PanoError),
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub frame_index: u64,
    pub event: ViewerEvent,
}

#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, frame_index: u64, event: ViewerEvent) {
        log::debug!("[bus] #{frame_index} {event:?}");
        self.events.push(Event { frame_index, event });
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
