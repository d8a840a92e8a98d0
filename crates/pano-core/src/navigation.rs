//! Walking the station graph.
//!
//! A navigation is split around its two suspension points (metadata fetch,
//! panorama decode) so the session is only borrowed between awaits:
//!
//! 1. `Session::begin_navigation` hands out a ticket;
//! 2. the station document is fetched;
//! 3. `Session::finish_metadata` makes the station current and returns the
//!    texture still to load;
//! 4. the panorama is decoded;
//! 5. `Session::finish_texture` swaps it in if the station is still current.
//!
//! Nothing is cancelled. Under the default policy the request that completes
//! last wins; a texture never lands on another station's markers.

use std::cell::RefCell;

use crate::config::NavigationPolicy;
use crate::error::PanoError;
use crate::markers::Command;
use crate::services::{MiniMap, PanoramaLoader, SceneRenderer, StationSource};
use crate::session::Session;
use crate::station::StationId;

/// Identifies one in-flight navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavTicket {
    pub seq: u64,
    epoch: u64,
    pub id: StationId,
    /// True when this navigation opens the viewer.
    pub opening: bool,
}

/// Panorama still to be fetched for a station that just became current.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTexture {
    pub station: StationId,
    pub image: String,
    pub fix_heading: f64,
}

/// Sequencing for overlapping navigations.
#[derive(Debug, Default)]
pub struct Walker {
    policy: NavigationPolicy,
    issued: u64,
    epoch: u64,
    in_flight: usize,
}

impl Walker {
    pub fn new(policy: NavigationPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn begin(&mut self, id: StationId, opening: bool) -> NavTicket {
        self.issued += 1;
        self.in_flight += 1;
        log::info!("[nav] #{} -> {}", self.issued, id);
        NavTicket {
            seq: self.issued,
            epoch: self.epoch,
            id,
            opening,
        }
    }

    /// Retire a ticket; true when its result may become current.
    pub fn complete(&mut self, ticket: &NavTicket) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        if ticket.epoch != self.epoch {
            log::debug!("[nav] #{} finished after close, ignored", ticket.seq);
            return false;
        }
        match self.policy {
            NavigationPolicy::LastCompleted => true,
            NavigationPolicy::LatestIssued => {
                let latest = ticket.seq == self.issued;
                if !latest {
                    log::debug!(
                        "[nav] #{} superseded by #{}, ignored",
                        ticket.seq,
                        self.issued
                    );
                }
                latest
            }
        }
    }

    /// Outstanding results are dropped when they arrive.
    pub fn invalidate(&mut self) {
        self.epoch += 1;
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

/// Open the viewer at `id`.
pub async fn open<R, M, S, L>(
    session: &RefCell<Session<R, M>>,
    source: &S,
    loader: &L,
    id: StationId,
) -> Result<(), PanoError>
where
    R: SceneRenderer,
    M: MiniMap,
    S: StationSource,
    L: PanoramaLoader,
{
    let ticket = session.borrow_mut().begin_navigation(id, true)?;
    walk(session, source, loader, ticket).await
}

/// Navigate the open viewer to `id`.
pub async fn go_to<R, M, S, L>(
    session: &RefCell<Session<R, M>>,
    source: &S,
    loader: &L,
    id: StationId,
) -> Result<(), PanoError>
where
    R: SceneRenderer,
    M: MiniMap,
    S: StationSource,
    L: PanoramaLoader,
{
    let ticket = session.borrow_mut().begin_navigation(id, false)?;
    walk(session, source, loader, ticket).await
}

/// Carry out a command produced by clicking a marker, a map point or the main map.
pub async fn execute<R, M, S, L>(
    session: &RefCell<Session<R, M>>,
    source: &S,
    loader: &L,
    command: Command,
) -> Result<(), PanoError>
where
    R: SceneRenderer,
    M: MiniMap,
    S: StationSource,
    L: PanoramaLoader,
{
    match command {
        Command::Open(id) => open(session, source, loader, id).await,
        Command::NavigateTo(id) => go_to(session, source, loader, id).await,
    }
}

async fn walk<R, M, S, L>(
    session: &RefCell<Session<R, M>>,
    source: &S,
    loader: &L,
    ticket: NavTicket,
) -> Result<(), PanoError>
where
    R: SceneRenderer,
    M: MiniMap,
    S: StationSource,
    L: PanoramaLoader,
{
    let fetched = source.fetch_station(&ticket.id).await;
    let pending = session.borrow_mut().finish_metadata(ticket, fetched)?;
    let Some(pending) = pending else {
        return Ok(());
    };
    let decoded = loader.load_panorama(&pending.image).await;
    session.borrow_mut().finish_texture(pending, decoded)
}
