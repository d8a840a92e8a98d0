use std::fmt;

use thiserror::Error;

use crate::station::StationId;

/// Why a station metadata request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    NotFound,
    Network,
    Parse,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchFailure::NotFound => "not found",
            FetchFailure::Network => "network error",
            FetchFailure::Parse => "invalid metadata",
        };
        f.write_str(s)
    }
}

/// Every failure the viewer can hit. None of them are fatal: the session keeps
/// showing the previous station and the last error is kept for the UI.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PanoError {
    #[error("failed to load station {id}: {kind} ({detail})")]
    MetadataFetch {
        id: StationId,
        kind: FetchFailure,
        detail: String,
    },
    #[error("failed to decode panorama {image}: {detail}")]
    TextureDecode { image: String, detail: String },
    #[error("no station found near ({lat:.6}, {lon:.6})")]
    NoNeighborFound { lat: f64, lon: f64 },
    #[error("panorama viewer is not open")]
    NotOpen,
    #[error("render error: {0}")]
    Render(String),
}

impl PanoError {
    pub fn metadata(id: &StationId, kind: FetchFailure, detail: impl Into<String>) -> Self {
        PanoError::MetadataFetch {
            id: id.clone(),
            kind,
            detail: detail.into(),
        }
    }

    pub fn texture(image: impl Into<String>, detail: impl Into<String>) -> Self {
        PanoError::TextureDecode {
            image: image.into(),
            detail: detail.into(),
        }
    }
}

/// Last recoverable error, surfaced to the user until cleared or superseded.
#[derive(Debug, Default, Clone)]
pub struct ErrorState {
    last: Option<PanoError>,
}

impl ErrorState {
    pub fn record(&mut self, err: PanoError) {
        log::warn!("[error] {}", err);
        self.last = Some(err);
    }

    pub fn clear(&mut self) {
        self.last = None;
    }

    pub fn last(&self) -> Option<&PanoError> {
        self.last.as_ref()
    }
}
