//! Mesh entities discovered while ingesting engine listings.
//!
//! Nodes and beam elements are keyed by the numbers the engine assigned.
//! Section nodes are sampling points inside a beam cross-section and are
//! created lazily per (element, end node, section point).

use fe_core::{ElementId, LineId, MeshNodeId, SectionPointId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{ResultsError, ResultsResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshNode {
    pub id: MeshNodeId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub thxy: f64,
    pub thyz: f64,
    pub thzx: f64,
}

/// Which end of a beam element a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementEnd {
    I,
    J,
}

impl ElementEnd {
    /// Suffix the engine appends to element-nodal listings.
    pub fn file_suffix(self) -> &'static str {
        match self {
            ElementEnd::I => "_inode",
            ElementEnd::J => "_jnode",
        }
    }

    /// Column prefix used by element-nodal listings (`iFx`, `jFx`).
    pub fn column_prefix(self) -> &'static str {
        match self {
            ElementEnd::I => "i",
            ElementEnd::J => "j",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshBeamElement {
    pub id: ElementId,
    pub line: LineId,
    pub i_node: MeshNodeId,
    pub j_node: MeshNodeId,
    /// Orientation / mid node, when the element type has one.
    pub k_node: Option<MeshNodeId>,
}

impl MeshBeamElement {
    pub fn end_node(&self, end: ElementEnd) -> MeshNodeId {
        match end {
            ElementEnd::I => self.i_node,
            ElementEnd::J => self.j_node,
        }
    }

    pub fn has_node(&self, node: MeshNodeId) -> bool {
        self.i_node == node || self.j_node == node || self.k_node == Some(node)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionNode {
    pub element: ElementId,
    pub node: MeshNodeId,
    pub point: SectionPointId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    nodes: BTreeMap<MeshNodeId, MeshNode>,
    elements: BTreeMap<ElementId, MeshBeamElement>,
    lines: BTreeMap<LineId, Vec<ElementId>>,
    section_nodes: BTreeSet<SectionNode>,
    nodes_loaded: bool,
    elements_loaded: bool,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node on first reference. Returns false if it already existed.
    pub fn insert_node(&mut self, node: MeshNode) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id, node);
        true
    }

    /// Register a beam element on first reference. Its end nodes must exist.
    pub fn insert_element(&mut self, element: MeshBeamElement) -> ResultsResult<bool> {
        if self.elements.contains_key(&element.id) {
            return Ok(false);
        }
        let referenced = [Some(element.i_node), Some(element.j_node), element.k_node];
        for id in referenced.into_iter().flatten() {
            self.node(id)?;
        }
        self.elements.insert(element.id, element);
        self.lines.entry(element.line).or_default().push(element.id);
        Ok(true)
    }

    pub fn node(&self, id: MeshNodeId) -> ResultsResult<&MeshNode> {
        self.nodes
            .get(&id)
            .ok_or(ResultsError::MissingMeshNode { id })
    }

    pub fn element(&self, id: ElementId) -> ResultsResult<&MeshBeamElement> {
        self.elements
            .get(&id)
            .ok_or(ResultsError::MissingElement { id })
    }

    /// Get or create the section node at `point` of `element` at its end `node`.
    pub fn section_node(
        &mut self,
        element: ElementId,
        node: MeshNodeId,
        point: SectionPointId,
    ) -> ResultsResult<SectionNode> {
        let beam = self.element(element)?;
        if !beam.has_node(node) {
            return Err(ResultsError::NodeNotOnElement { element, node });
        }
        let key = SectionNode {
            element,
            node,
            point,
        };
        self.section_nodes.insert(key);
        Ok(key)
    }

    pub fn elements_of_line(&self, line: LineId) -> &[ElementId] {
        self.lines.get(&line).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &MeshNode> {
        self.nodes.values()
    }

    pub fn elements(&self) -> impl Iterator<Item = &MeshBeamElement> {
        self.elements.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn section_node_count(&self) -> usize {
        self.section_nodes.len()
    }

    pub fn nodes_loaded(&self) -> bool {
        self.nodes_loaded
    }

    pub fn elements_loaded(&self) -> bool {
        self.elements_loaded
    }

    pub fn mark_nodes_loaded(&mut self) {
        self.nodes_loaded = true;
    }

    pub fn mark_elements_loaded(&mut self) {
        self.elements_loaded = true;
    }
}
