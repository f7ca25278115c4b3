use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// User-visible notifications. Each maps to one fixed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    PermissionRequired,
    DataNotFound,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::PermissionRequired => "Location permission is required to show local weather",
            Notice::DataNotFound => "Weather data not found",
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Something that can show a [`Notice`] to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_display_keeps_order() {
        let c = Coordinates::new(51.5, -0.12);
        assert_eq!(c.to_string(), "51.5, -0.12");
    }

    #[test]
    fn notices_have_distinct_messages() {
        assert_ne!(Notice::PermissionRequired.message(), Notice::DataNotFound.message());
    }
}
