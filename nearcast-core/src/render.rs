//! Turns a weather document into the text and icon shown on screen.
//!
//! Rendering is applied step by step onto a [`Screen`]. A step that cannot
//! extract its fields stops the render: steps already applied stay, later
//! fields keep whatever they showed before.

use chrono::{DateTime, FixedOffset, Local, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write;

use crate::provider::icons::{DEFAULT_ICON, icon_url};

/// Text templates for the screen fields. Placeholders are written `{name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayTemplates {
    /// `{city}`, `{country}`
    pub city: String,
    /// `{humidity}`, `{pressure}`
    pub details: String,
    /// `{temp}`
    pub temperature: String,
    pub temperature_decimals: usize,
    /// `{updated}`
    pub updated: String,
    /// chrono `strftime` pattern for `{updated}`.
    pub date_format: String,
}

impl Default for DisplayTemplates {
    fn default() -> Self {
        Self {
            city: "{city}, {country}".to_string(),
            details: "Humidity: {humidity}%  Pressure: {pressure} hPa".to_string(),
            temperature: "{temp} ℃".to_string(),
            temperature_decimals: 2,
            updated: "Last updated: {updated}".to_string(),
            date_format: "%b %-d, %Y %-I:%M:%S %p".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transition {
    #[default]
    CrossFade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scale {
    #[default]
    CenterCrop,
}

/// The image region. `image` stays empty until the loader delivers bytes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IconView {
    pub url: String,
    pub transition: Transition,
    pub scale: Scale,
    pub image: Option<Vec<u8>>,
}

impl IconView {
    pub fn new(url: String) -> Self {
        Self { url, ..Default::default() }
    }
}

/// Everything the single screen shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Screen {
    pub city: Option<String>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub temperature: Option<String>,
    pub updated: Option<String>,
    pub icon: Option<IconView>,
}

impl Screen {
    /// Shows the loaded image if the view still points at `url`.
    pub fn apply_icon(&mut self, url: &str, image: Vec<u8>) -> bool {
        match self.icon.as_mut() {
            Some(view) if view.url == url => {
                view.image = Some(image);
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let blank = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

        writeln!(f, "{}", blank(&self.city))?;
        writeln!(f, "{}", blank(&self.description))?;
        writeln!(f, "{}", blank(&self.details))?;
        writeln!(f, "{}", blank(&self.temperature))?;
        writeln!(f, "{}", blank(&self.updated))?;
        match &self.icon {
            Some(icon) => write!(f, "icon: {}", icon.url),
            None => write!(f, "icon: -"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("field `{0}` is missing")]
    Missing(&'static str),
    #[error("field `{0}` has an unexpected type")]
    WrongType(&'static str),
    #[error("timestamp {0} is out of range")]
    Timestamp(i64),
    #[error("invalid date format `{0}`")]
    DateFormat(String),
}

/// The first `weather` entry, or the fallbacks used when there is none.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditions {
    pub description: Option<String>,
    pub icon: String,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    templates: DisplayTemplates,
    icon_base_url: String,
    // `None` means the machine's local zone.
    offset: Option<FixedOffset>,
}

impl Renderer {
    pub fn new(templates: DisplayTemplates, icon_base_url: impl Into<String>) -> Self {
        Self { templates, icon_base_url: icon_base_url.into(), offset: None }
    }

    /// Format timestamps in a fixed zone instead of the local one.
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn render(&self, json: &Value, screen: &mut Screen) -> Result<(), RenderError> {
        let city = require_str(json, "name", "name")?.to_uppercase();
        let country = require_str(nested(json, "sys"), "country", "sys.country")?;
        screen.city =
            Some(fill(&self.templates.city, &[("city", city.as_str()), ("country", country)]));

        let conditions = conditions(json)?;
        let main = nested(json, "main");
        let humidity = require_text(main, "humidity", "main.humidity")?;
        let pressure = require_text(main, "pressure", "main.pressure")?;
        if let Some(description) = conditions.description {
            screen.description = Some(description);
        }
        screen.details = Some(fill(
            &self.templates.details,
            &[("humidity", humidity.as_str()), ("pressure", pressure.as_str())],
        ));

        let url = icon_url(&self.icon_base_url, &conditions.icon);
        if screen.icon.as_ref().map(|icon| icon.url.as_str()) != Some(url.as_str()) {
            screen.icon = Some(IconView::new(url));
        }

        let temp = require_f64(main, "temp", "main.temp")?;
        let temp = format!("{:.*}", self.templates.temperature_decimals, temp);
        screen.temperature = Some(fill(&self.templates.temperature, &[("temp", temp.as_str())]));

        let dt = require_i64(json, "dt", "dt")?;
        let updated = self.format_epoch(dt)?;
        screen.updated = Some(fill(&self.templates.updated, &[("updated", updated.as_str())]));

        Ok(())
    }

    pub fn format_epoch(&self, secs: i64) -> Result<String, RenderError> {
        match self.offset {
            Some(offset) => format_in(&offset, secs, &self.templates.date_format),
            None => format_in(&Local, secs, &self.templates.date_format),
        }
    }
}

/// Decision table for the `weather` array: no entry means no description and
/// the default icon; an entry must carry both fields.
pub fn conditions(json: &Value) -> Result<Conditions, RenderError> {
    let Some(first) = json.get("weather").and_then(Value::as_array).and_then(|a| a.first())
    else {
        return Ok(Conditions { description: None, icon: DEFAULT_ICON.to_string() });
    };

    let description = require_str(Some(first), "description", "weather[0].description")?;
    let icon = require_str(Some(first), "icon", "weather[0].icon")?;

    Ok(Conditions { description: Some(description.to_string()), icon: icon.to_string() })
}

fn format_in<Tz>(tz: &Tz, secs: i64, pattern: &str) -> Result<String, RenderError>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let utc = DateTime::from_timestamp(secs, 0).ok_or(RenderError::Timestamp(secs))?;
    let mut out = String::new();
    write!(out, "{}", utc.with_timezone(tz).format(pattern))
        .map_err(|_| RenderError::DateFormat(pattern.to_string()))?;
    Ok(out)
}

fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}

fn nested<'a>(json: &'a Value, key: &str) -> Option<&'a Value> {
    json.get(key)
}

fn field<'a>(
    parent: Option<&'a Value>,
    key: &str,
    label: &'static str,
) -> Result<&'a Value, RenderError> {
    match parent.and_then(|p| p.get(key)) {
        None | Some(Value::Null) => Err(RenderError::Missing(label)),
        Some(v) => Ok(v),
    }
}

fn require_str<'a>(
    parent: impl Into<Option<&'a Value>>,
    key: &str,
    label: &'static str,
) -> Result<&'a str, RenderError> {
    field(parent.into(), key, label)?.as_str().ok_or(RenderError::WrongType(label))
}

/// Strings pass through; numbers and booleans are shown as written.
fn require_text(
    parent: Option<&Value>,
    key: &str,
    label: &'static str,
) -> Result<String, RenderError> {
    match field(parent, key, label)? {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(RenderError::WrongType(label)),
    }
}

fn require_f64(parent: Option<&Value>, key: &str, label: &'static str) -> Result<f64, RenderError> {
    match field(parent, key, label)? {
        Value::Number(n) => n.as_f64().ok_or(RenderError::WrongType(label)),
        Value::String(s) => s.trim().parse().map_err(|_| RenderError::WrongType(label)),
        _ => Err(RenderError::WrongType(label)),
    }
}

fn require_i64(parent: &Value, key: &str, label: &'static str) -> Result<i64, RenderError> {
    match field(Some(parent), key, label)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or(RenderError::WrongType(label)),
        Value::String(s) => s.trim().parse().map_err(|_| RenderError::WrongType(label)),
        _ => Err(RenderError::WrongType(label)),
    }
}
