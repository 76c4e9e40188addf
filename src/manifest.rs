//! Registry manifests.
//!
//! A manifest describes a layer list as JSON so that an export step can emit
//! data instead of code. Layers are listed bottom first; vector data files
//! are resolved relative to the manifest's directory.
//!
//! ```json
//! {
//!   "layers": [
//!     { "kind": "tile", "title": {"text": "Google Satellite"},
//!       "url": "https://mt1.google.com/vt/lyrs=s&x={x}&y={y}&z={z}" },
//!     { "kind": "vector", "title": {"text": "Point_counts"},
//!       "data": "Point_counts_1.geojson", "style": "style_Point_counts_1" }
//!   ]
//! }
//! ```

use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LayerError, Result};
use crate::geo::{Crs, Extent, VectorSource};
use crate::registry::{
    LabelMode, LayerId, LayerList, LayerRegistryBuilder, LayerTitle, RenderHook, StyleRef,
};

fn default_opacity() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_data_crs() -> Crs {
    Crs::Wgs84
}

fn default_view_crs() -> Crs {
    Crs::WebMercator
}

/// Where a vector layer's features come from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum VectorData {
    /// Path of a GeoJSON file
    GeoJson(PathBuf),
    /// Shapefile with optional attribute table
    Shapefile {
        shp: PathBuf,
        #[serde(default)]
        dbf: Option<PathBuf>,
    },
}

/// Field metadata as three parallel mappings keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldsSpec {
    pub aliases: IndexMap<String, String>,
    pub labels: IndexMap<String, LabelMode>,
    pub widgets: IndexMap<String, String>,
}

/// One layer entry of a manifest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerSpec {
    Tile {
        title: LayerTitle,
        url: String,
        #[serde(default)]
        attribution: String,
        #[serde(default = "default_opacity")]
        opacity: f64,
        #[serde(default = "default_true")]
        visible: bool,
    },
    Vector {
        title: LayerTitle,
        data: VectorData,
        style: StyleRef,
        #[serde(default = "default_data_crs")]
        data_crs: Crs,
        #[serde(default = "default_view_crs")]
        view_crs: Crs,
        #[serde(default = "default_true")]
        interactive: bool,
        #[serde(default = "default_true")]
        visible: bool,
        #[serde(default)]
        attribution: String,
        #[serde(default)]
        popup_title: Option<String>,
        #[serde(default)]
        declutter: bool,
        #[serde(default)]
        fields: Option<FieldsSpec>,
        #[serde(default)]
        render_hook: Option<RenderHook>,
    },
    StaticImage {
        title: LayerTitle,
        url: String,
        extent: Extent,
        #[serde(default = "default_view_crs")]
        projection: Crs,
        #[serde(default = "default_opacity")]
        opacity: f64,
        #[serde(default = "default_true")]
        visible: bool,
        #[serde(default)]
        attribution: String,
    },
}

/// A layer list described as data.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegistryManifest {
    pub layers: Vec<LayerSpec>,
    /// Directory data paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> LayerError + '_ {
    move |source| LayerError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Reads a text file; invalid UTF-8 is an error rather than replaced.
fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(io_error(path))
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(io_error(path))
}

impl RegistryManifest {
    /// Parses a manifest; relative data paths resolve against `base_dir`.
    pub fn from_json(json: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut manifest: RegistryManifest =
            serde_json::from_str(json).map_err(LayerError::Manifest)?;
        manifest.base_dir = base_dir.into();
        Ok(manifest)
    }

    /// Reads a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = read_text(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        log::info!("Loading registry manifest from {}", path.display());
        Self::from_json(&json, base_dir)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn load_vector(&self, data: &VectorData, data_crs: Crs, view_crs: Crs) -> Result<VectorSource> {
        match data {
            VectorData::GeoJson(path) => {
                let raw = read_text(&self.resolve(path))?;
                VectorSource::from_geojson(&raw, data_crs, view_crs)
            }
            VectorData::Shapefile { shp, dbf } => {
                let shp_bytes = read_bytes(&self.resolve(shp))?;
                let dbf_bytes = match dbf {
                    Some(dbf) => Some(read_bytes(&self.resolve(dbf))?),
                    None => None,
                };
                VectorSource::from_shapefile(&shp_bytes, dbf_bytes.as_deref(), data_crs, view_crs)
            }
        }
    }

    /// Builds the layer list, in manifest order.
    pub fn build(&self) -> Result<LayerList> {
        let mut builder = LayerRegistryBuilder::new();

        for spec in &self.layers {
            match spec {
                LayerSpec::Tile {
                    title,
                    url,
                    attribution,
                    opacity,
                    visible,
                } => {
                    let id = builder.build_tile_layer(title.clone(), *opacity, url, attribution);
                    builder.set_initial_visibility(&id, *visible)?;
                }
                LayerSpec::Vector {
                    title,
                    data,
                    style,
                    data_crs,
                    view_crs,
                    interactive,
                    visible,
                    attribution,
                    popup_title,
                    declutter,
                    fields,
                    render_hook,
                } => {
                    let source = self
                        .load_vector(data, *data_crs, *view_crs)?
                        .with_attribution(attribution.as_str());
                    let id = builder.add_vector_source(
                        source,
                        style.clone(),
                        title.clone(),
                        *interactive,
                    );
                    builder.set_initial_visibility(&id, *visible)?;
                    builder.set_declutter(&id, *declutter)?;
                    if let Some(popup_title) = popup_title {
                        builder.set_popup_title(&id, popup_title.as_str())?;
                    }
                    if let Some(fields) = fields {
                        attach_fields(&mut builder, &id, fields)?;
                    }
                    if let Some(hook) = render_hook {
                        builder.set_render_hook(&id, *hook)?;
                    }
                }
                LayerSpec::StaticImage {
                    title,
                    url,
                    extent,
                    projection,
                    opacity,
                    visible,
                    attribution,
                } => {
                    let id = builder.build_static_image_layer(
                        title.clone(),
                        url,
                        *extent,
                        *projection,
                        *opacity,
                    );
                    builder.set_initial_visibility(&id, *visible)?;
                    builder.set_attribution(&id, attribution)?;
                }
            }
        }

        Ok(builder.finalize())
    }
}

fn attach_fields(
    builder: &mut LayerRegistryBuilder,
    id: &LayerId,
    fields: &FieldsSpec,
) -> Result<()> {
    let aliases: Vec<(&str, &str)> = fields
        .aliases
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let labels: Vec<(&str, LabelMode)> = fields
        .labels
        .iter()
        .map(|(k, v)| (k.as_str(), *v))
        .collect();
    let widgets: Vec<(&str, &str)> = fields
        .widgets
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    builder.attach_field_metadata(id, &aliases, &labels, &widgets)
}
