//! Seams to the platform's location service and its authorization flow.

use async_trait::async_trait;

use crate::model::Coordinates;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Granted,
    Denied,
}

/// Coarse-location authorization.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Whether access is granted right now.
    fn is_granted(&self) -> bool;

    /// Ask the user for access and wait for their decision.
    async fn request(&self) -> PermissionDecision;
}

/// Single-shot query for the last fix the platform already has.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn last_known_location(&self) -> Option<Coordinates>;
}

/// Location provider backed by coordinates known up front.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredLocation {
    fix: Option<Coordinates>,
}

impl ConfiguredLocation {
    pub fn new(fix: Option<Coordinates>) -> Self {
        Self { fix }
    }
}

#[async_trait]
impl LocationProvider for ConfiguredLocation {
    async fn last_known_location(&self) -> Option<Coordinates> {
        self.fix
    }
}

/// Gate with a fixed answer. Requests return the same answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermission {
    granted: bool,
}

impl StaticPermission {
    pub fn granted() -> Self {
        Self { granted: true }
    }

    pub fn denied() -> Self {
        Self { granted: false }
    }
}

#[async_trait]
impl PermissionGate for StaticPermission {
    fn is_granted(&self) -> bool {
        self.granted
    }

    async fn request(&self) -> PermissionDecision {
        if self.granted { PermissionDecision::Granted } else { PermissionDecision::Denied }
    }
}
