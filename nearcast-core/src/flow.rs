//! The weather fetch flow: permission → location → fetch → render.
//!
//! [`WeatherFlow`] runs the steps up to the fetch, which it spawns as a task.
//! Every user-visible effect is posted as a [`UiEvent`] to the single
//! [`RenderContext`], which applies events one at a time in arrival order.
//! Overlapping triggers are allowed; whichever fetch completes last renders last.

use serde_json::Value;
use std::sync::Arc;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::{JoinError, JoinHandle, JoinSet},
};
use tracing::{debug, info, warn};

use crate::{
    location::{LocationProvider, PermissionDecision, PermissionGate},
    model::{Coordinates, Notice, Notifier},
    preferences::{CURRENT_LOCATION, LOCATION_KEY, PreferenceStore},
    provider::{FetchError, IconLoader, WeatherSource},
    render::{Renderer, Screen},
};

#[derive(Debug)]
pub enum UiEvent {
    Fetched(Result<Value, FetchError>),
    Notify(Notice),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerOutcome {
    PermissionDenied,
    /// No recent fix; nothing else happens.
    NoLocation,
    Dispatched(Coordinates),
}

/// Receives the screen after every change.
pub trait ScreenSink: Send + Sync {
    fn show(&self, screen: &Screen);
}

pub struct WeatherFlow {
    gate: Arc<dyn PermissionGate>,
    location: Arc<dyn LocationProvider>,
    preferences: Arc<dyn PreferenceStore>,
    source: Arc<dyn WeatherSource>,
    ui: UnboundedSender<UiEvent>,
}

impl WeatherFlow {
    pub fn new(
        gate: Arc<dyn PermissionGate>,
        location: Arc<dyn LocationProvider>,
        preferences: Arc<dyn PreferenceStore>,
        source: Arc<dyn WeatherSource>,
        ui: UnboundedSender<UiEvent>,
    ) -> Self {
        Self { gate, location, preferences, source, ui }
    }

    /// One button press. Checks authorization from scratch every time.
    pub async fn trigger(&self) -> TriggerOutcome {
        if self.gate.is_granted() {
            return self.fetch_for_current_location().await;
        }

        info!("location access not granted, requesting it");
        let decision = self.gate.request().await;
        self.on_permission_result(decision).await
    }

    pub async fn on_permission_result(&self, decision: PermissionDecision) -> TriggerOutcome {
        match decision {
            PermissionDecision::Granted => self.fetch_for_current_location().await,
            PermissionDecision::Denied => {
                self.post(UiEvent::Notify(Notice::PermissionRequired));
                TriggerOutcome::PermissionDenied
            }
        }
    }

    async fn fetch_for_current_location(&self) -> TriggerOutcome {
        let Some(coords) = self.location.last_known_location().await else {
            debug!("no last known location");
            return TriggerOutcome::NoLocation;
        };

        self.dispatch(coords);

        if let Err(e) = self.preferences.set(LOCATION_KEY, CURRENT_LOCATION) {
            warn!(error = %e, "failed to record location preference");
        }

        TriggerOutcome::Dispatched(coords)
    }

    /// Fetch off the render context; the result is posted back to it.
    pub fn dispatch(&self, coords: Coordinates) -> JoinHandle<()> {
        let source = Arc::clone(&self.source);
        let ui = self.ui.clone();
        info!(%coords, "fetching weather");

        tokio::spawn(async move {
            let result = source.fetch(coords).await;
            if let Err(e) = &result {
                debug!(error = %e, "weather fetch produced no result");
            }
            post(&ui, UiEvent::Fetched(result));
        })
    }

    fn post(&self, event: UiEvent) {
        post(&self.ui, event);
    }
}

fn post(ui: &UnboundedSender<UiEvent>, event: UiEvent) {
    if ui.send(event).is_err() {
        debug!("render context is gone, dropping event");
    }
}

type IconLoad = (String, anyhow::Result<Vec<u8>>);

/// Owner of the [`Screen`]; the only place it is mutated.
pub struct RenderContext {
    screen: Screen,
    renderer: Renderer,
    icons: Arc<dyn IconLoader>,
    notifier: Arc<dyn Notifier>,
    sink: Arc<dyn ScreenSink>,
    rx: UnboundedReceiver<UiEvent>,
    icon_loads: JoinSet<IconLoad>,
}

impl RenderContext {
    /// Returns the context and the sender the flow posts to.
    pub fn new(
        renderer: Renderer,
        icons: Arc<dyn IconLoader>,
        notifier: Arc<dyn Notifier>,
        sink: Arc<dyn ScreenSink>,
    ) -> (Self, UnboundedSender<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = Self {
            screen: Screen::default(),
            renderer,
            icons,
            notifier,
            sink,
            rx,
            icon_loads: JoinSet::new(),
        };
        (ctx, tx)
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Process events and icon loads until every sender is dropped and no
    /// load is pending; returns the final screen.
    pub async fn run(mut self) -> Screen {
        let mut open = true;
        loop {
            tokio::select! {
                event = self.rx.recv(), if open => match event {
                    Some(event) => self.handle(event),
                    None => open = false,
                },
                Some(done) = self.icon_loads.join_next(), if !self.icon_loads.is_empty() => {
                    self.icon_loaded(done);
                }
                else => break,
            }
        }
        self.screen
    }

    pub fn handle(&mut self, event: UiEvent) {
        match event {
            UiEvent::Fetched(Ok(json)) => self.render(&json),
            UiEvent::Fetched(Err(_)) => self.notifier.notify(Notice::DataNotFound),
            UiEvent::Notify(notice) => self.notifier.notify(notice),
        }
    }

    fn icon_loaded(&mut self, done: Result<IconLoad, JoinError>) {
        match done {
            Ok((url, Ok(image))) => {
                if self.screen.apply_icon(&url, image) {
                    self.sink.show(&self.screen);
                } else {
                    debug!(%url, "icon no longer on screen");
                }
            }
            Ok((url, Err(e))) => debug!(error = %e, %url, "failed to load icon"),
            Err(e) => debug!(error = %e, "icon load task ended early"),
        }
    }

    fn render(&mut self, json: &Value) {
        if let Err(e) = self.renderer.render(json, &mut self.screen) {
            debug!(error = %e, "render stopped early");
        }
        self.sink.show(&self.screen);

        let pending = self.screen.icon.as_ref().filter(|icon| icon.image.is_none());
        if let Some(url) = pending.map(|icon| icon.url.clone()) {
            self.load_icon(url);
        }
    }

    fn load_icon(&mut self, url: String) {
        let icons = Arc::clone(&self.icons);

        self.icon_loads.spawn(async move {
            let result = icons.load(&url).await;
            (url, result)
        });
    }
}
