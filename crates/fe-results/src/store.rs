//! In-memory result store for one iteration.

use fe_core::{ElementId, MeshNodeId};
use serde::{Deserialize, Serialize};

use crate::mesh::{Mesh, SectionNode};
use crate::taxonomy::{AnalysisShape, ResultClassification, ResultType, ViewDirection};
use crate::values::ResultValue;

/// Reference into the mesh a value is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResultLocation {
    Model,
    Element { element: ElementId },
    MeshNode { node: MeshNodeId },
    ElementNode { element: ElementId, node: MeshNodeId },
    SectionNode(SectionNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    pub classification: ResultClassification,
    pub location: ResultLocation,
    pub value: ResultValue,
}

/// Captured engine image for one result and camera direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenShot {
    pub classification: ResultClassification,
    pub direction: ViewDirection,
    pub png: Vec<u8>,
}

/// Mesh entities and result items owned by a single run.
#[derive(Debug, Default)]
pub struct ResultStore {
    pub mesh: Mesh,
    items: Vec<ResultItem>,
    screenshots: Vec<ScreenShot>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: ResultItem) {
        self.items.push(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = ResultItem>) {
        self.items.extend(items);
    }

    pub fn push_screenshot(&mut self, shot: ScreenShot) {
        self.screenshots.push(shot);
    }

    pub fn items(&self) -> &[ResultItem] {
        &self.items
    }

    pub fn screenshots(&self) -> &[ScreenShot] {
        &self.screenshots
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Scalar values of `result_type` computed for `shape`, with their locations.
    ///
    /// Items are stored once per row of a family listing, so this filters on the
    /// shape and extracts the component rather than matching the classification.
    pub fn values_of(
        &self,
        result_type: ResultType,
        shape: AnalysisShape,
    ) -> Vec<(ResultLocation, f64)> {
        self.items
            .iter()
            .filter(|item| item.classification.shape == shape)
            .filter_map(|item| {
                item.value
                    .component(result_type)
                    .map(|value| (item.location, value))
            })
            .collect()
    }

    /// Decompose into serializable parts.
    pub fn into_parts(self) -> (Mesh, Vec<ResultItem>, Vec<ScreenShot>) {
        (self.mesh, self.items, self.screenshots)
    }

    pub fn from_parts(mesh: Mesh, items: Vec<ResultItem>, screenshots: Vec<ScreenShot>) -> Self {
        Self {
            mesh,
            items,
            screenshots,
        }
    }
}
