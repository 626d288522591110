//! Safety-aware pedestrian routing.
//!
//! A [`SafetyGrid`] scores coordinates, a [`RouteComposer`] asks a
//! [`RouteProvider`] for a fastest and a shortest route in parallel and turns
//! them into a safe/fast [`RoutePair`], falling back to synthetic routes when
//! the provider is unreachable. [`SafetyService`] ties these together with
//! user reports and location tracking, and [`api`] serves it over HTTP.

pub mod api;
pub mod composer;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod location;
pub mod provider;
pub mod reports;
pub mod route;
pub mod safety;
pub mod scoring;
pub mod service;
pub mod session;
pub mod synthetic;

pub use composer::{RouteComposer, RoutePolicy};
pub use config::Config;
pub use coordinate::Coordinate;
pub use error::{Error, Result};
pub use provider::{ProviderError, RouteProvider};
pub use route::{RoutePair, RouteRole, RouteSource, ScoredRoute};
pub use safety::SafetyGrid;
pub use service::SafetyService;
