use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::utils::error::{Result, ViewerError};
use crate::utils::validation::validate_hex_color;

pub const DEFAULT_LINE_WEIGHT: u32 = 3;
pub const MIN_LINE_WEIGHT: u32 = 1;
pub const MAX_LINE_WEIGHT: u32 = 10;
pub const SHADOW_OPACITY: f64 = 0.5;
pub const SELECTED_SHADOW_OPACITY: f64 = 1.0;
pub const HIGHLIGHT_WEIGHT: u32 = 10;
pub const HIGHLIGHT_OPACITY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    pub fn parse(value: &str) -> Result<Self> {
        validate_hex_color("color", value)?;
        Ok(Self(value.to_ascii_lowercase()))
    }

    pub fn red() -> Self {
        Self("#ff0000".to_string())
    }

    pub fn black() -> Self {
        Self("#000000".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HexColor {
    fn default() -> Self {
        Self::red()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HexColor {
    type Error = ViewerError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

/// 地圖上一個圖層的不透明代號
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(u64);

impl OverlayId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Main,
    Shadow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayStyle {
    pub color: HexColor,
    pub weight: u32,
    pub opacity: f64,
    pub fill: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub fn from_point(lon: f64, lat: f64) -> Self {
        Self {
            south: lat,
            west: lon,
            north: lat,
            east: lon,
        }
    }

    pub fn extend(&mut self, lon: f64, lat: f64) {
        self.south = self.south.min(lat);
        self.north = self.north.max(lat);
        self.west = self.west.min(lon);
        self.east = self.east.max(lon);
    }

    pub fn merge(&mut self, other: &Bounds) {
        self.extend(other.west, other.south);
        self.extend(other.east, other.north);
    }

    pub fn center(&self) -> LatLon {
        LatLon {
            lat: (self.south + self.north) / 2.0,
            lon: (self.west + self.east) / 2.0,
        }
    }

    /// Top edge, horizontally centered. Hover labels sit here.
    pub fn top_center(&self) -> LatLon {
        LatLon {
            lat: self.north,
            lon: self.center().lon,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePopup {
    pub feature_index: usize,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Overlay {
    pub id: OverlayId,
    pub kind: OverlayKind,
    pub features: FeatureCollection,
    pub style: OverlayStyle,
    pub popups: Vec<FeaturePopup>,
    pub bounds: Option<Bounds>,
}

#[derive(Debug, Clone)]
pub struct OverlayPair {
    pub main: Overlay,
    pub shadow: Overlay,
}

/// Weights, colors and opacities shared by every loaded layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub base_weight: u32,
    pub default_color: HexColor,
    pub main_opacity: f64,
    pub shadow_opacity: f64,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            base_weight: DEFAULT_LINE_WEIGHT,
            default_color: HexColor::red(),
            main_opacity: 1.0,
            shadow_opacity: SHADOW_OPACITY,
        }
    }
}

impl LineStyle {
    pub fn shadow_weight(&self) -> u32 {
        self.base_weight * 2
    }

    pub fn main_style(&self, color: &HexColor) -> OverlayStyle {
        OverlayStyle {
            color: color.clone(),
            weight: self.base_weight,
            opacity: self.main_opacity,
            fill: false,
        }
    }

    pub fn shadow_style(&self, selected: bool) -> OverlayStyle {
        if selected {
            OverlayStyle {
                color: HexColor::black(),
                weight: self.shadow_weight() * 2,
                opacity: SELECTED_SHADOW_OPACITY,
                fill: false,
            }
        } else {
            OverlayStyle {
                color: HexColor::black(),
                weight: self.shadow_weight(),
                opacity: self.shadow_opacity,
                fill: false,
            }
        }
    }

    pub fn highlight_style(&self) -> OverlayStyle {
        OverlayStyle {
            color: HexColor::black(),
            weight: HIGHLIGHT_WEIGHT,
            opacity: HIGHLIGHT_OPACITY,
            fill: false,
        }
    }
}

/// 一個已載入的 KML 檔在畫面上的全部狀態
#[derive(Debug, Clone)]
pub struct LayerEntry {
    pub name: String,
    pub main: Overlay,
    pub shadow: Overlay,
    pub color: HexColor,
    pub visible: bool,
}

impl LayerEntry {
    pub fn new(name: impl Into<String>, overlays: OverlayPair, color: HexColor) -> Self {
        Self {
            name: name.into(),
            main: overlays.main,
            shadow: overlays.shadow,
            color,
            visible: true,
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.main.bounds
    }
}

/// Hover outline drawn around a layer's extent.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub layer: String,
    pub outline: Bounds,
    pub style: OverlayStyle,
    pub label: String,
    pub label_position: LatLon,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
    pub project: Option<String>,
    pub user: Option<String>,
}

/// Where the text of an incoming file comes from.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// A file on local disk, read asynchronously.
    Path(std::path::PathBuf),
    /// Text that was already read, e.g. a dropped file.
    Inline(String),
    /// A file in the current project's `KML-Files` folder on the project store.
    Project,
}

#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub source: FileSource,
}

impl IncomingFile {
    pub fn from_path(path: impl Into<std::path::PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            source: FileSource::Path(path),
        }
    }

    pub fn inline(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Inline(text.into()),
        }
    }

    pub fn project(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Project,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub added_names: Vec<String>,
    pub ignored_names: Vec<String>,
    pub invalid_names: Vec<String>,
}

impl IngestSummary {
    pub fn total(&self) -> usize {
        self.added_names.len() + self.ignored_names.len() + self.invalid_names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color_is_normalised() {
        let color = HexColor::parse("#4CAF50").unwrap();
        assert_eq!(color.as_str(), "#4caf50");
        assert!(HexColor::parse("green").is_err());
    }

    #[test]
    fn test_line_style_weights() {
        let style = LineStyle::default();
        assert_eq!(style.shadow_weight(), 6);
        assert_eq!(style.shadow_style(false).weight, 6);
        assert_eq!(style.shadow_style(false).opacity, 0.5);
        assert_eq!(style.shadow_style(true).weight, 12);
        assert_eq!(style.shadow_style(true).opacity, 1.0);
        assert_eq!(style.main_style(&HexColor::red()).weight, 3);
    }

    #[test]
    fn test_bounds_center() {
        let mut bounds = Bounds::from_point(10.0, 50.0);
        bounds.extend(12.0, 52.0);
        let top = bounds.top_center();
        assert_eq!(top.lat, 52.0);
        assert_eq!(top.lon, 11.0);
        assert_eq!(bounds.center().lat, 51.0);
    }

    #[test]
    fn test_incoming_file_from_path_uses_file_name() {
        let file = IncomingFile::from_path("/tmp/data/A_01_Survey.kml");
        assert_eq!(file.name, "A_01_Survey.kml");
    }
}
