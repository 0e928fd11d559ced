//! Section-point listings: per element and element node, one row per
//! cross-section sampling point with five values.

use super::Artifact;
use crate::error::IngestResult;
use fe_core::{ElementId, MeshNodeId, SectionPointId};
use regex::Regex;

const ELEMENT_PATTERN: &str = r"^\s*ELEMENT\s*=\s*(?<ID>\d*)\s*SECTION";
const NODE_PATTERN: &str = r"^\s*ELEMENT NODE =\s*(?<ID>\d*)";
const DATA_PATTERN: &str = r"^(?<SECNODE>\s+\d+)(?<D1>\s+[\-\+\.\dE]+)(?<D2>\s+[\-\+\.\dE]+)(?<D3>\s+[\-\+\.\dE]+)(?<D4>\s+[\-\+\.\dE]+)(?<D5>\s+[\-\+\.\dE]+)";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionRow {
    pub line: usize,
    pub element: ElementId,
    pub node: MeshNodeId,
    pub point: SectionPointId,
    pub values: [f64; 5],
}

pub fn section_rows(artifact: &Artifact<'_>) -> IngestResult<Vec<SectionRow>> {
    let element_re = Regex::new(ELEMENT_PATTERN)?;
    let node_re = Regex::new(NODE_PATTERN)?;
    let data_re = Regex::new(DATA_PATTERN)?;

    let mut element: Option<ElementId> = None;
    let mut node: Option<MeshNodeId> = None;
    let mut rows = Vec::new();

    for (line_no, line) in artifact.lines() {
        if let Some(caps) = element_re.captures(line) {
            element = Some(artifact.id(line_no, &caps["ID"], "ELEMENT")?);
            node = None;
            continue;
        }
        if let Some(caps) = node_re.captures(line) {
            node = Some(artifact.id(line_no, &caps["ID"], "ELEMENT NODE")?);
            continue;
        }
        let Some(caps) = data_re.captures(line) else {
            continue;
        };

        let (Some(element), Some(node)) = (element, node) else {
            return Err(artifact.error(
                line_no,
                format!("section point row before its ELEMENT/ELEMENT NODE header: {:?}", line.trim()),
            ));
        };
        let point = artifact.id(line_no, &caps["SECNODE"], "section point")?;
        let mut values = [0.0; 5];
        for (idx, slot) in values.iter_mut().enumerate() {
            let group = format!("D{}", idx + 1);
            *slot = artifact.number(line_no, &caps[group.as_str()], &group)?;
        }

        rows.push(SectionRow {
            line: line_no,
            element,
            node,
            point,
            values,
        });
    }

    Ok(rows)
}
