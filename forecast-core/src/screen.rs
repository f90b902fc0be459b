//! State machine behind the forecast screen.
//!
//! A mount asks for location permission, reads the position once and then
//! calls the gateway once. A failed gateway call can be retried with the
//! position already acquired; permission and location failures are final
//! for the lifetime of the mount.
//!
//! Every gateway call is tied to a [`FetchTicket`]. Only the ticket of the
//! most recent call, on a still-mounted screen, may commit a result; any
//! other completion is dropped.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    client::{FetchError, ForecastSource},
    location::{LocationProvider, PermissionStatus},
    model::{Coordinate, ForecastBundle, SearchTerm},
    present::ForecastView,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScreenError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location unavailable")]
    LocationUnavailable,
    #[error("Forecast fetch failed")]
    FetchFailed,
}

impl ScreenError {
    /// Text shown on the screen.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "Location Permission is needed in order for the app to function accurately"
            }
            Self::LocationUnavailable => "Error getting location, please try again",
            Self::FetchFailed => "Error fetching weather",
        }
    }

    /// Only fetch failures offer a Retry action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchFailed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenState {
    Loading,
    AwaitingLocation,
    Ready(ForecastView),
    Failed(ScreenError),
}

/// Handle for one in-flight gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    term: SearchTerm,
}

impl FetchTicket {
    pub fn term(&self) -> &SearchTerm {
        &self.term
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
pub struct ForecastScreen<L, S> {
    location: L,
    source: S,
    state: ScreenState,
    coordinate: Option<Coordinate>,
    generation: u64,
    mounted: bool,
}

impl<L, S> ForecastScreen<L, S>
where
    L: LocationProvider,
    S: ForecastSource,
{
    pub fn new(location: L, source: S) -> Self {
        Self {
            location,
            source,
            state: ScreenState::Loading,
            coordinate: None,
            generation: 0,
            mounted: false,
        }
    }

    pub fn state(&self) -> &ScreenState {
        &self.state
    }

    /// Position acquired by the current mount, if any.
    pub fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }

    /// Start from scratch: permission, position, then one gateway call.
    pub async fn mount(&mut self) -> &ScreenState {
        self.generation += 1;
        self.mounted = true;
        self.coordinate = None;
        self.state = ScreenState::Loading;

        if self.location.request_permission().await == PermissionStatus::Denied {
            info!("location permission denied");
            self.state = ScreenState::Failed(ScreenError::PermissionDenied);
            return &self.state;
        }

        self.state = ScreenState::AwaitingLocation;
        match self.location.current_position().await {
            Ok(coordinate) => {
                debug!(lat = coordinate.latitude, lon = coordinate.longitude, "location acquired");
                self.coordinate = Some(coordinate);
            }
            Err(e) => {
                warn!(error = %e, "failed to get location");
                self.state = ScreenState::Failed(ScreenError::LocationUnavailable);
                return &self.state;
            }
        }

        self.fetch().await;
        &self.state
    }

    /// Re-run the gateway call with the position already acquired. Returns
    /// `false`, doing nothing, unless the screen shows a fetch failure.
    pub async fn retry(&mut self) -> bool {
        if self.state != ScreenState::Failed(ScreenError::FetchFailed) {
            return false;
        }
        self.fetch().await
    }

    /// Drop the screen's interest in any in-flight call.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.generation += 1;
    }

    /// Mark a new gateway call as the only one allowed to commit.
    /// `None` when unmounted or no position has been acquired.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if !self.mounted {
            return None;
        }
        let coordinate = self.coordinate?;

        self.generation += 1;
        self.state = ScreenState::Loading;

        Some(FetchTicket { generation: self.generation, term: coordinate.to_search_term() })
    }

    /// Apply the outcome of the call behind `ticket`. Returns `false` when
    /// the ticket has been superseded or the screen unmounted; the result is
    /// then discarded.
    pub fn complete_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: Result<ForecastBundle, FetchError>,
    ) -> bool {
        if !self.mounted || ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale forecast response"
            );
            return false;
        }

        self.state = match result {
            Ok(bundle) => match ForecastView::from_bundle(&bundle) {
                Ok(view) => ScreenState::Ready(view),
                Err(e) => {
                    warn!(error = %e, "forecast bundle failed presence checks");
                    ScreenState::Failed(ScreenError::FetchFailed)
                }
            },
            Err(e) => {
                warn!(error = %e, "error fetching forecast");
                ScreenState::Failed(ScreenError::FetchFailed)
            }
        };
        true
    }

    async fn fetch(&mut self) -> bool {
        let Some(ticket) = self.begin_fetch() else {
            return false;
        };
        let result = self.source.submit_search(ticket.term()).await;
        self.complete_fetch(&ticket, result)
    }
}
