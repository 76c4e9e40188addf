//! Layer descriptors.
//!
//! A descriptor is everything the viewer needs to create one map layer:
//! its source, how it is titled in the layer switcher, and the flags and
//! hints that control its initial state.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use super::FieldMetadata;
use crate::geo::{Crs, Extent, VectorSource};

/// Layer identifier, `lyr_<Name>_<index>` by export convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives an identifier from a layer name and its stacking position.
    ///
    /// Characters outside `[A-Za-z0-9_]` are dropped from the name.
    pub fn from_name(name: &str, index: usize) -> Self {
        let cleaned: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        Self(format!("lyr_{}_{}", cleaned, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One row of a graduated or categorized legend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    /// Path of the legend swatch image
    pub image: String,
    /// Class label, e.g. `0 - 18`
    pub label: String,
}

impl LegendEntry {
    pub fn new(image: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            label: label.into(),
        }
    }
}

/// Legend shown next to the layer name in the layer switcher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Legend {
    #[default]
    None,
    /// A single swatch drawn before the layer name
    Symbol(String),
    /// One swatch per class, listed under the layer name
    Classes(Vec<LegendEntry>),
}

/// Display title of a layer, with optional legend markup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LayerTitle {
    pub text: String,
    #[serde(default)]
    pub legend: Legend,
}

impl LayerTitle {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            legend: Legend::None,
        }
    }

    pub fn with_symbol(mut self, image: impl Into<String>) -> Self {
        self.legend = Legend::Symbol(image.into());
        self
    }

    pub fn with_classes(mut self, classes: Vec<LegendEntry>) -> Self {
        self.legend = Legend::Classes(classes);
        self
    }

    /// Renders the title as the HTML the layer switcher displays.
    pub fn to_html(&self) -> String {
        match &self.legend {
            Legend::None => self.text.clone(),
            Legend::Symbol(image) => format!("<img src=\"{}\" /> {}", image, self.text),
            Legend::Classes(classes) => {
                let mut html = format!("{}<br />", self.text);
                for class in classes {
                    let row = format!("<img src=\"{}\" /> {}<br />", class.image, class.label);
                    html.push_str(&row);
                }
                html
            }
        }
    }
}

impl From<&str> for LayerTitle {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Serialize for LayerTitle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("LayerTitle", 3)?;
        state.serialize_field("text", &self.text)?;
        state.serialize_field("legend", &self.legend)?;
        state.serialize_field("html", &self.to_html())?;
        state.end()
    }
}

/// Layer opacity, always within `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Opacity(f64);

impl Opacity {
    pub const OPAQUE: Opacity = Opacity(1.0);

    /// Clamps the value into range; NaN becomes fully opaque.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            log::warn!("Opacity is NaN, using 1.0");
            return Self::OPAQUE;
        }
        if !(0.0..=1.0).contains(&value) {
            log::warn!("Opacity {} out of range, clamping", value);
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Self::OPAQUE
    }
}

/// Identifier of a style function supplied by the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleRef(pub String);

impl StyleRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// XYZ tile source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileSource {
    /// URL with `{x}`, `{y}` and `{z}` placeholders
    pub url_template: String,
    pub attribution: String,
}

impl TileSource {
    /// Expands the URL template for one tile.
    pub fn tile_url(&self, x: u32, y: u32, z: u8) -> String {
        self.url_template
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
            .replace("{z}", &z.to_string())
    }
}

/// A single georeferenced image stretched over a fixed extent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticImageSource {
    pub url: String,
    /// Image bounds in `projection` units
    pub extent: Extent,
    pub projection: Crs,
    pub attribution: String,
    /// Draw at every resolution, ignoring the layer's zoom range
    pub always_in_range: bool,
}

/// Where a layer's content comes from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerSource {
    Tile(TileSource),
    Vector(VectorSource),
    StaticImage(StaticImageSource),
}

/// Source category, without the source data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Tile,
    Vector,
    StaticImage,
}

impl LayerSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            LayerSource::Tile(_) => SourceKind::Tile,
            LayerSource::Vector(_) => SourceKind::Vector,
            LayerSource::StaticImage(_) => SourceKind::StaticImage,
        }
    }
}

/// Canvas compositing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompositeOperation {
    /// Resets blending to the viewer's default
    Normal,
    SourceOver,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
}

/// Render-time configuration the viewer applies around drawing a layer.
///
/// The registry only records the hook; invoking it is the viewer's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RenderHook {
    /// Set the canvas composite operation before the layer is composed
    Precompose { composite: CompositeOperation },
}

/// Everything the viewer needs to create one layer.
///
/// Descriptors are written by the builder only and are read-only once the
/// list is finalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    pub(crate) id: LayerId,
    pub(crate) title: LayerTitle,
    pub(crate) opacity: Opacity,
    pub(crate) visible: bool,
    pub(crate) interactive: bool,
    pub(crate) source: LayerSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) style: Option<StyleRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) popup_title: Option<String>,
    pub(crate) declutter: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) field_metadata: Option<FieldMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) render_hook: Option<RenderHook>,
}

impl LayerDescriptor {
    pub(crate) fn new(
        id: LayerId,
        title: LayerTitle,
        opacity: Opacity,
        source: LayerSource,
    ) -> Self {
        Self {
            id,
            title,
            opacity,
            visible: true,
            interactive: false,
            source,
            style: None,
            popup_title: None,
            declutter: false,
            field_metadata: None,
            render_hook: None,
        }
    }

    pub fn id(&self) -> &LayerId {
        &self.id
    }

    pub fn title(&self) -> &LayerTitle {
        &self.title
    }

    pub fn opacity(&self) -> f64 {
        self.opacity.value()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the viewer should answer clicks on this layer's features.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn source(&self) -> &LayerSource {
        &self.source
    }

    pub fn kind(&self) -> SourceKind {
        self.source.kind()
    }

    pub fn vector_source(&self) -> Option<&VectorSource> {
        match &self.source {
            LayerSource::Vector(source) => Some(source),
            _ => None,
        }
    }

    pub fn style(&self) -> Option<&StyleRef> {
        self.style.as_ref()
    }

    pub fn popup_title(&self) -> Option<&str> {
        self.popup_title.as_deref()
    }

    pub fn declutter(&self) -> bool {
        self.declutter
    }

    pub fn field_metadata(&self) -> Option<&FieldMetadata> {
        self.field_metadata.as_ref()
    }

    pub fn render_hook(&self) -> Option<RenderHook> {
        self.render_hook
    }

    /// Bounds of the layer's content; tile layers have none.
    pub fn extent(&self) -> Option<Extent> {
        match &self.source {
            LayerSource::StaticImage(image) => Some(image.extent),
            LayerSource::Vector(source) => source.extent(),
            LayerSource::Tile(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_id_follows_export_convention() {
        assert_eq!(
            LayerId::from_name("Google Satellite", 0).as_str(),
            "lyr_GoogleSatellite_0"
        );
        assert_eq!(
            LayerId::from_name("Point_counts", 1).as_str(),
            "lyr_Point_counts_1"
        );
        assert_eq!(
            LayerId::from_name("Typologie des climats français", 3).as_str(),
            "lyr_Typologiedesclimatsfranais_3"
        );
    }

    #[test]
    fn test_title_html_with_classes() {
        let classes = vec![
            LegendEntry::new("styles/legend/Point_counts_1_0.png", "0 - 18"),
            LegendEntry::new("styles/legend/Point_counts_1_1.png", "18 - 60"),
        ];
        let title = LayerTitle::new("Point_counts").with_classes(classes);

        assert_eq!(
            title.to_html(),
            "Point_counts<br /><img src=\"styles/legend/Point_counts_1_0.png\" /> 0 - 18<br />\
             <img src=\"styles/legend/Point_counts_1_1.png\" /> 18 - 60<br />"
        );
    }

    #[test]
    fn test_title_html_with_symbol() {
        let symbol = "styles/legend/COMMUNE_BR_unique_2.png";
        let title = LayerTitle::new("COMMUNE_BR_unique").with_symbol(symbol);
        assert_eq!(
            title.to_html(),
            "<img src=\"styles/legend/COMMUNE_BR_unique_2.png\" /> COMMUNE_BR_unique"
        );
        assert_eq!(LayerTitle::new("Plain").to_html(), "Plain");
    }

    #[test]
    fn test_opacity_is_clamped() {
        assert_eq!(Opacity::new(0.5).value(), 0.5);
        assert_eq!(Opacity::new(1.7).value(), 1.0);
        assert_eq!(Opacity::new(-0.2).value(), 0.0);
        assert_eq!(Opacity::new(f64::NAN).value(), 1.0);
    }

    #[test]
    fn test_tile_url_expansion() {
        let source = TileSource {
            url_template: "https://mt1.google.com/vt/lyrs=s&x={x}&y={y}&z={z}".to_string(),
            attribution: String::new(),
        };
        assert_eq!(
            source.tile_url(263, 187, 9),
            "https://mt1.google.com/vt/lyrs=s&x=263&y=187&z=9"
        );
    }

    #[test]
    fn test_render_hook_serialization() {
        let hook = RenderHook::Precompose {
            composite: CompositeOperation::Normal,
        };
        assert_eq!(
            serde_json::to_value(hook).unwrap(),
            serde_json::json!({"event": "precompose", "composite": "normal"})
        );
    }
}
