//! Column-positioned listings (nodal reactions).

use super::Artifact;
use fe_core::MeshNodeId;
use fe_results::NodalReactions;

const NODE_START: usize = 1;
const NODE_WIDTH: usize = 10;
const VALUE_START: usize = NODE_START + NODE_WIDTH;
const VALUE_WIDTH: usize = 20;

/// Slice `width` columns from `start`, clipped to the line. `None` past the end.
pub fn field(line: &str, start: usize, width: usize) -> Option<&str> {
    if start >= line.len() {
        return None;
    }
    let end = (start + width).min(line.len());
    line.get(start..end)
}

/// Reaction rows: a node id followed by up to six optional components.
///
/// Page headers and partial rows are common in these listings. A row whose id
/// does not parse is skipped; a component that does not parse ends the row.
/// Rows are kept only when they carry at least one component.
pub fn reaction_rows(artifact: &Artifact<'_>) -> Vec<(usize, MeshNodeId, NodalReactions)> {
    let mut rows = Vec::new();

    for (line_no, line) in artifact.lines() {
        let Some(node) = field(line, NODE_START, NODE_WIDTH)
            .and_then(|raw| raw.trim().parse::<MeshNodeId>().ok())
        else {
            continue;
        };

        let mut components = [None; 6];
        for (idx, slot) in components.iter_mut().enumerate() {
            let Some(raw) = field(line, VALUE_START + idx * VALUE_WIDTH, VALUE_WIDTH) else {
                break;
            };
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            match raw.parse::<f64>() {
                Ok(value) => *slot = Some(value),
                Err(_) => break,
            }
        }

        let [fx, fy, fz, mx, my, mz] = components;
        let reactions = NodalReactions {
            fx,
            fy,
            fz,
            mx,
            my,
            mz,
        };
        if reactions.contains_any_value() {
            rows.push((line_no, node, reactions));
        }
    }

    rows
}
