//! Core library for the `nearcast` weather screen.
//!
//! This crate defines:
//! - Configuration and the small preference store
//! - Seams to the platform location service and its permission flow
//! - The OpenWeather fetcher and icon loader
//! - Rendering of a weather document onto the screen model
//! - The fetch flow tying these together around a single render context
//!
//! It is used by `nearcast-cli`, but the traits let other front ends plug in
//! their own location, permission and display implementations.

pub mod config;
pub mod flow;
pub mod location;
pub mod model;
pub mod preferences;
pub mod provider;
pub mod render;

pub use config::Config;
pub use flow::{RenderContext, ScreenSink, TriggerOutcome, UiEvent, WeatherFlow};
pub use location::{LocationProvider, PermissionDecision, PermissionGate};
pub use model::{Coordinates, Notice, Notifier};
pub use preferences::PreferenceStore;
pub use provider::{FetchError, WeatherSource};
pub use render::{Renderer, Screen};
