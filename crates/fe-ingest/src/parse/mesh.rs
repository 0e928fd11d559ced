//! Mesh listings: node coordinates and line/element connectivity.

use super::Artifact;
use super::delimited::DelimitedTable;
use crate::error::IngestResult;
use fe_results::{MeshBeamElement, MeshNode};
use regex::Regex;

const NODE_PATTERN: &str = r"^(?<NODE>\s+[\-\+\.\dE]+)(?<X>\s+[\-\+\.\dE]+)(?<Y>\s+[\-\+\.\dE]+)(?<Z>\s+[\-\+\.\dE]+)(?<THXY>\s+[\-\+\.\dE]+)(?<THYZ>\s+[\-\+\.\dE]+)(?<THZX>\s+[\-\+\.\dE]+)\s*$";

/// Nodes listed as `NODE X Y Z THXY THYZ THZX`. Lines of another shape are skipped.
pub fn mesh_nodes(artifact: &Artifact<'_>) -> IngestResult<Vec<MeshNode>> {
    let node_re = Regex::new(NODE_PATTERN)?;
    let mut nodes = Vec::new();

    for (line_no, line) in artifact.lines() {
        let Some(caps) = node_re.captures(line) else {
            continue;
        };
        let coord = |name: &str| artifact.number(line_no, &caps[name], name);
        nodes.push(MeshNode {
            id: artifact.id(line_no, &caps["NODE"], "NODE")?,
            x: coord("X")?,
            y: coord("Y")?,
            z: coord("Z")?,
            thxy: coord("THXY")?,
            thyz: coord("THYZ")?,
            thzx: coord("THZX")?,
        });
    }

    Ok(nodes)
}

/// Connectivity rows `LINE,ELEM,INODE,JNODE,KNODE`; a `KNODE` of 0 means none.
/// Elements listed twice keep their first row.
pub fn mesh_elements(artifact: &Artifact<'_>) -> IngestResult<Vec<MeshBeamElement>> {
    let table = DelimitedTable::parse(artifact)?;
    let line = table.column(artifact, "LINE")?;
    let elem = table.column(artifact, "ELEM")?;
    let inode = table.column(artifact, "INODE")?;
    let jnode = table.column(artifact, "JNODE")?;
    let knode = table.optional_column("KNODE");

    let mut seen = std::collections::HashSet::new();
    let mut elements = Vec::new();
    for row in table.rows() {
        let id = row.id(artifact, elem, "ELEM")?;
        if !seen.insert(id) {
            continue;
        }
        let k_node = match knode {
            Some(col) if !matches!(row.text(col), "" | "0") => {
                Some(row.id(artifact, col, "KNODE")?)
            }
            _ => None,
        };
        elements.push(MeshBeamElement {
            id,
            line: row.id(artifact, line, "LINE")?,
            i_node: row.id(artifact, inode, "INODE")?,
            j_node: row.id(artifact, jnode, "JNODE")?,
            k_node,
        });
    }

    Ok(elements)
}
