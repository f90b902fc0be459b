//! Core library for the `forecast` gateway and screen.
//!
//! This crate defines:
//! - Configuration handling
//! - The upstream weather provider and the search-term store
//! - The gateway flow and its HTTP surface
//! - The client-side screen state machine and its presentation
//!
//! It is used by `forecast-cli`, but can also be embedded by other binaries or services.

pub mod client;
pub mod clock;
pub mod config;
pub mod gateway;
pub mod location;
pub mod model;
pub mod present;
pub mod provider;
pub mod screen;
pub mod server;
pub mod store;

pub use client::{FetchError, ForecastSource, GatewayClient};
pub use clock::{Clock, FixedClock, OffsetClock};
pub use config::Config;
pub use gateway::{Gateway, GatewayError};
pub use location::{LocationProvider, PermissionStatus, StaticLocation};
pub use model::{Coordinate, ForecastBundle, SearchRecord, SearchTerm, UpsertAck};
pub use present::{ForecastView, render};
pub use provider::{ForecastKind, ForecastProvider};
pub use screen::{ForecastScreen, ScreenError, ScreenState};
pub use store::{JsonFileStore, MemoryStore, SearchStore};
