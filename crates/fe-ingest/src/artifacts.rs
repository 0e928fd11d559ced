//! Artifact names the engine is expected to write during one iteration.

use fe_results::{ElementEnd, ResultClassification, ResultFamily, ResultLocationKind, ResultType};
use std::collections::BTreeMap;

pub const MESH_NODES_ARTIFACT: &str = "ems_output_meshinfo_nodal_locations.txt";
pub const MESH_ELEMENTS_ARTIFACT: &str = "ems_output_meshinfo_elements_of_lines.txt";

/// A result listing produced for one classification group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultArtifact {
    /// Classification the rows are stored under; see [`representative`].
    pub classification: ResultClassification,
    /// Element end for split element-nodal listings.
    pub end: Option<ElementEnd>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    MeshNodes,
    MeshElements,
    Result(ResultArtifact),
    /// PNG whose file name ends in `_{ViewDirection}`.
    Screenshot(ResultClassification),
}

/// What must already be ingested before an artifact can be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MeshRequirement {
    None,
    Nodes,
    Elements,
}

impl ArtifactKind {
    pub fn requirement(&self) -> MeshRequirement {
        match self {
            ArtifactKind::MeshNodes | ArtifactKind::Screenshot(_) => MeshRequirement::None,
            ArtifactKind::MeshElements => MeshRequirement::Nodes,
            ArtifactKind::Result(artifact) => match artifact.classification.location() {
                ResultLocationKind::Model => MeshRequirement::None,
                ResultLocationKind::Node => MeshRequirement::Nodes,
                ResultLocationKind::Element
                | ResultLocationKind::ElementNode
                | ResultLocationKind::SectionNode => MeshRequirement::Elements,
            },
        }
    }

    /// Ingestion order within one pass: mesh first, then results, then images.
    fn rank(&self) -> u8 {
        match self {
            ArtifactKind::MeshNodes => 0,
            ArtifactKind::MeshElements => 1,
            ArtifactKind::Result(_) => 2,
            ArtifactKind::Screenshot(_) => 3,
        }
    }
}

/// The classification whose listing carries the rows of `classification`.
///
/// Mechanical families share one listing per shape, keyed by the family's
/// first result type. The three buckling factors share one summary.
pub fn representative(classification: ResultClassification) -> ResultClassification {
    let family = classification.family();
    let result_type = if classification.is_eigenvalue_buckling() {
        ResultType::EigenvalueBucklingMode1Factor
    } else if family == ResultFamily::Others {
        classification.result_type
    } else {
        ResultType::ALL
            .iter()
            .copied()
            .find(|t| t.family() == family)
            .unwrap_or(classification.result_type)
    };
    ResultClassification::new(result_type, classification.shape)
}

/// File names the engine writes for `classification`, one per element end
/// for split listings.
pub fn result_artifacts(classification: ResultClassification) -> Vec<(String, ResultArtifact)> {
    let rep = representative(classification);
    let stem = rep.output_stem();
    let split = rep.family().is_element_nodal() || rep.result_type == ResultType::CodeCheck;
    if split {
        [ElementEnd::I, ElementEnd::J]
            .into_iter()
            .map(|end| {
                (
                    format!("{stem}{}.txt", end.file_suffix()),
                    ResultArtifact {
                        classification: rep,
                        end: Some(end),
                    },
                )
            })
            .collect()
    } else {
        vec![(
            format!("{stem}.txt"),
            ResultArtifact {
                classification: rep,
                end: None,
            },
        )]
    }
}

/// Completion barrier of one iteration: artifact name to what it contains.
#[derive(Debug, Clone, Default)]
pub struct ExpectedOutputSet {
    entries: BTreeMap<String, ArtifactKind>,
}

impl ExpectedOutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if `name` was already expected.
    pub fn insert(&mut self, name: impl Into<String>, kind: ArtifactKind) -> bool {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return false;
        }
        self.entries.insert(name, kind);
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<ArtifactKind> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<ArtifactKind> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in ingestion order.
    pub fn ordered(&self) -> Vec<(String, ArtifactKind)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(name, kind)| (name.clone(), *kind))
            .collect();
        entries.sort_by(|a, b| a.1.rank().cmp(&b.1.rank()).then_with(|| a.0.cmp(&b.0)));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fe_results::AnalysisShape;

    fn class(t: ResultType, s: AnalysisShape) -> ResultClassification {
        ResultClassification::new(t, s)
    }

    #[test]
    fn family_members_share_a_representative() {
        let a = representative(class(ResultType::ElementForceMz, AnalysisShape::Perfect));
        let b = representative(class(ResultType::ElementForceFx, AnalysisShape::Perfect));
        assert_eq!(a, b);
        assert_eq!(a.family(), ResultFamily::ElementNodalForce);

        let soft = representative(class(ResultType::ElementForceMz, AnalysisShape::ImperfectSoftened));
        assert_ne!(a, soft);
    }

    #[test]
    fn buckling_factors_share_the_summary() {
        let mode3 = representative(class(
            ResultType::EigenvalueBucklingMode3Factor,
            AnalysisShape::ImperfectFullStiffness,
        ));
        assert_eq!(mode3.result_type, ResultType::EigenvalueBucklingMode1Factor);

        let energy = representative(class(ResultType::StrainEnergy, AnalysisShape::Perfect));
        assert_eq!(energy.result_type, ResultType::StrainEnergy);
    }

    #[test]
    fn element_nodal_listings_are_split() {
        let names: Vec<_> = result_artifacts(class(ResultType::ElementStressSBzB, AnalysisShape::Perfect))
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            names,
            [
                "ems_output_PerfectShape_ElementNodal_Stress_inode.txt",
                "ems_output_PerfectShape_ElementNodal_Stress_jnode.txt",
            ]
        );

        let check = result_artifacts(class(ResultType::CodeCheck, AnalysisShape::ImperfectSoftened));
        assert_eq!(check.len(), 2);
        assert_eq!(check[1].1.end, Some(ElementEnd::J));

        let energy = result_artifacts(class(ResultType::StrainEnergy, AnalysisShape::Perfect));
        assert_eq!(
            energy[0].0,
            "ems_output_PerfectShape_Others_Element_StrainEnergy.txt"
        );
        assert_eq!(energy[0].1.end, None);
    }

    #[test]
    fn ordered_puts_mesh_first() {
        let mut set = ExpectedOutputSet::new();
        let eigen = ArtifactKind::Result(ResultArtifact {
            classification: class(ResultType::EigenvalueBucklingMode1Factor, AnalysisShape::Perfect),
            end: None,
        });
        assert!(set.insert("a_eigen.txt", eigen));
        assert!(set.insert(MESH_ELEMENTS_ARTIFACT, ArtifactKind::MeshElements));
        assert!(set.insert(MESH_NODES_ARTIFACT, ArtifactKind::MeshNodes));
        assert!(!set.insert("a_eigen.txt", eigen));

        let names: Vec<_> = set.ordered().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, [MESH_NODES_ARTIFACT, MESH_ELEMENTS_ARTIFACT, "a_eigen.txt"]);
        assert_eq!(eigen.requirement(), MeshRequirement::None);
        assert_eq!(ArtifactKind::MeshElements.requirement(), MeshRequirement::Nodes);
    }
}
