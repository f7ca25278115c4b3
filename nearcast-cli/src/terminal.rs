//! Terminal implementations of the platform seams.

use async_trait::async_trait;
use inquire::Confirm;
use nearcast_core::{
    Config, Notice, Notifier, PermissionDecision, PermissionGate, Screen, ScreenSink,
};
use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};
use tracing::warn;

/// Asks on the terminal. A grant is remembered in the config file; a denial is not.
#[derive(Debug)]
pub struct PromptPermissionGate {
    granted: AtomicBool,
}

impl PromptPermissionGate {
    pub fn new(granted: bool) -> Self {
        Self { granted: AtomicBool::new(granted) }
    }
}

#[async_trait]
impl PermissionGate for PromptPermissionGate {
    fn is_granted(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    async fn request(&self) -> PermissionDecision {
        let answer = tokio::task::spawn_blocking(|| {
            Confirm::new("Allow nearcast to use your location?")
                .with_default(false)
                .with_help_message("Needed to look up the weather where you are")
                .prompt()
        })
        .await;

        match answer {
            Ok(Ok(true)) => {
                self.granted.store(true, Ordering::SeqCst);
                if let Err(e) = remember_grant() {
                    warn!(error = %e, "failed to save location grant");
                }
                PermissionDecision::Granted
            }
            _ => PermissionDecision::Denied,
        }
    }
}

fn remember_grant() -> anyhow::Result<()> {
    let mut config = Config::load()?;
    config.location_authorized = true;
    config.save()
}

#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        eprintln!("! {notice}");
    }
}

/// Prints the screen when its text changes if `live`, otherwise stays quiet.
#[derive(Debug)]
pub struct TerminalScreen {
    live: bool,
    last: Mutex<String>,
}

impl TerminalScreen {
    pub fn live() -> Self {
        Self { live: true, last: Mutex::default() }
    }

    pub fn quiet() -> Self {
        Self { live: false, last: Mutex::default() }
    }
}

impl ScreenSink for TerminalScreen {
    fn show(&self, screen: &Screen) {
        if !self.live {
            return;
        }

        let text = screen.to_string();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if *last != text {
            println!("\n{text}\n");
            *last = text;
        }
    }
}
