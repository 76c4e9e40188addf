//! The finalized, ordered layer list handed to the viewer.

use serde::Serialize;
use std::ops::Index;

use super::{LayerDescriptor, LayerId, SourceKind};
use crate::error::{LayerError, Result};

/// Layers in stacking order: later entries are drawn on top.
///
/// Read-only once built; owned by whatever performs startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LayerList {
    layers: Vec<LayerDescriptor>,
}

impl LayerList {
    pub(crate) fn new(layers: Vec<LayerDescriptor>) -> Self {
        Self { layers }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LayerDescriptor> {
        self.layers.iter()
    }

    pub fn get(&self, id: &LayerId) -> Option<&LayerDescriptor> {
        self.layers.iter().find(|layer| layer.id() == id)
    }

    /// Looks a layer up by its identifier string.
    pub fn find(&self, id: &str) -> Option<&LayerDescriptor> {
        self.layers.iter().find(|layer| layer.id().as_str() == id)
    }

    /// Stacking position of a layer (0 is the bottom).
    pub fn position(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id() == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &LayerId> {
        self.layers.iter().map(|layer| layer.id())
    }

    /// Layers that start out visible, bottom to top.
    pub fn visible(&self) -> impl Iterator<Item = &LayerDescriptor> {
        self.layers.iter().filter(|layer| layer.is_visible())
    }

    pub fn of_kind(&self, kind: SourceKind) -> impl Iterator<Item = &LayerDescriptor> {
        self.layers.iter().filter(move |layer| layer.kind() == kind)
    }

    /// Serializes the list into the JSON document the viewer shell loads.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        json.map_err(LayerError::Serialize)
    }
}

impl Index<usize> for LayerList {
    type Output = LayerDescriptor;

    fn index(&self, index: usize) -> &Self::Output {
        &self.layers[index]
    }
}

impl<'a> IntoIterator for &'a LayerList {
    type Item = &'a LayerDescriptor;
    type IntoIter = std::slice::Iter<'a, LayerDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}
