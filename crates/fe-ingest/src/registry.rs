//! Per-family strategies: which listings a classification produces and how
//! each listing becomes result items.

use crate::artifacts::{ResultArtifact, result_artifacts};
use crate::error::{IngestError, IngestResult};
use crate::parse::Artifact;
use crate::parse::delimited::DelimitedTable;
use crate::parse::{eigen, fixed_width, section};
use fe_results::{
    ElementEnd, ElementNodalBendingStrain, ElementNodalCodeCheck, ElementNodalForces,
    ElementNodalStrain, ElementNodalStress, Mesh, NodalDisplacements, ResultClassification,
    ResultFamily, ResultItem, ResultLocation, ResultType, ResultValue, SectionNodalStrain,
    SectionNodalStress,
};
use std::collections::BTreeMap;

pub trait FamilyStrategy: Send + Sync {
    fn family(&self) -> ResultFamily;

    /// Listings written for `classification`, keyed by file name.
    fn artifacts(&self, classification: ResultClassification) -> Vec<(String, ResultArtifact)> {
        result_artifacts(classification)
    }

    /// Turn one listing into items, creating section nodes in `mesh` as needed.
    fn parse(
        &self,
        artifact: &Artifact<'_>,
        target: &ResultArtifact,
        mesh: &mut Mesh,
    ) -> IngestResult<Vec<ResultItem>>;
}

pub struct StrategyRegistry {
    strategies: BTreeMap<ResultFamily, Box<dyn FamilyStrategy>>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::ansys()
    }
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Strategies for the listings the Ansys bootstrap scripts write.
    pub fn ansys() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(NodalReactionStrategy));
        registry.register(Box::new(NodalDisplacementStrategy));
        registry.register(Box::new(SectionNodeStrategy::new(ResultFamily::SectionNodeStress)));
        registry.register(Box::new(SectionNodeStrategy::new(ResultFamily::SectionNodeStrain)));
        for family in [
            ResultFamily::ElementNodalBendingStrain,
            ResultFamily::ElementNodalForce,
            ResultFamily::ElementNodalStrain,
            ResultFamily::ElementNodalStress,
        ] {
            registry.register(Box::new(ElementNodalStrategy::new(family)));
        }
        registry.register(Box::new(OthersStrategy));
        registry
    }

    /// Replaces any strategy already registered for the same family.
    pub fn register(&mut self, strategy: Box<dyn FamilyStrategy>) -> Option<Box<dyn FamilyStrategy>> {
        self.strategies.insert(strategy.family(), strategy)
    }

    pub fn get(&self, family: ResultFamily) -> IngestResult<&dyn FamilyStrategy> {
        self.strategies
            .get(&family)
            .map(|s| s.as_ref())
            .ok_or_else(|| IngestError::NoStrategy {
                family: family.as_str().to_string(),
            })
    }

    pub fn artifacts(
        &self,
        classification: ResultClassification,
    ) -> IngestResult<Vec<(String, ResultArtifact)>> {
        Ok(self.get(classification.family())?.artifacts(classification))
    }

    pub fn parse(
        &self,
        artifact: &Artifact<'_>,
        target: &ResultArtifact,
        mesh: &mut Mesh,
    ) -> IngestResult<Vec<ResultItem>> {
        self.get(target.classification.family())?
            .parse(artifact, target, mesh)
    }
}

struct NodalReactionStrategy;

impl FamilyStrategy for NodalReactionStrategy {
    fn family(&self) -> ResultFamily {
        ResultFamily::NodalReaction
    }

    fn parse(
        &self,
        artifact: &Artifact<'_>,
        target: &ResultArtifact,
        mesh: &mut Mesh,
    ) -> IngestResult<Vec<ResultItem>> {
        fixed_width::reaction_rows(artifact)
            .into_iter()
            .map(|(_, node, reactions)| {
                mesh.node(node).map_err(|e| artifact.mesh_error(e))?;
                Ok(ResultItem {
                    classification: target.classification,
                    location: ResultLocation::MeshNode { node },
                    value: ResultValue::NodalReactions(reactions),
                })
            })
            .collect()
    }
}

struct NodalDisplacementStrategy;

impl FamilyStrategy for NodalDisplacementStrategy {
    fn family(&self) -> ResultFamily {
        ResultFamily::NodalDisplacement
    }

    fn parse(
        &self,
        artifact: &Artifact<'_>,
        target: &ResultArtifact,
        mesh: &mut Mesh,
    ) -> IngestResult<Vec<ResultItem>> {
        let table = DelimitedTable::parse(artifact)?;
        let node_col = table.column(artifact, "NODE")?;
        let names = ["UX", "UY", "UZ", "RX", "RY", "RZ"];
        let mut cols = [0usize; 6];
        for (slot, name) in cols.iter_mut().zip(names) {
            *slot = table.column(artifact, name)?;
        }

        let mut items = Vec::with_capacity(table.rows().len());
        for row in table.rows() {
            let node = row.id(artifact, node_col, "NODE")?;
            mesh.node(node).map_err(|e| artifact.mesh_error(e))?;
            let mut v = [0.0; 6];
            for ((slot, col), name) in v.iter_mut().zip(cols).zip(names) {
                *slot = row.number(artifact, col, name)?;
            }
            items.push(ResultItem {
                classification: target.classification,
                location: ResultLocation::MeshNode { node },
                value: ResultValue::NodalDisplacements(NodalDisplacements {
                    ux: v[0],
                    uy: v[1],
                    uz: v[2],
                    rx: v[3],
                    ry: v[4],
                    rz: v[5],
                }),
            });
        }
        Ok(items)
    }
}

struct SectionNodeStrategy {
    family: ResultFamily,
}

impl SectionNodeStrategy {
    fn new(family: ResultFamily) -> Self {
        Self { family }
    }

    fn value(&self, d: [f64; 5]) -> ResultValue {
        match self.family {
            ResultFamily::SectionNodeStrain => ResultValue::SectionNodalStrain(SectionNodalStrain {
                eptt1: d[0],
                eptt2: d[1],
                eptt3: d[2],
                epttint: d[3],
                eptteqv: d[4],
            }),
            _ => ResultValue::SectionNodalStress(SectionNodalStress {
                s1: d[0],
                s2: d[1],
                s3: d[2],
                sint: d[3],
                seqv: d[4],
            }),
        }
    }
}

impl FamilyStrategy for SectionNodeStrategy {
    fn family(&self) -> ResultFamily {
        self.family
    }

    fn parse(
        &self,
        artifact: &Artifact<'_>,
        target: &ResultArtifact,
        mesh: &mut Mesh,
    ) -> IngestResult<Vec<ResultItem>> {
        section::section_rows(artifact)?
            .into_iter()
            .map(|row| {
                let section_node = mesh
                    .section_node(row.element, row.node, row.point)
                    .map_err(|e| artifact.mesh_error(e))?;
                Ok(ResultItem {
                    classification: target.classification,
                    location: ResultLocation::SectionNode(section_node),
                    value: self.value(row.values),
                })
            })
            .collect()
    }
}

/// Columns of an element-nodal listing, without the `i`/`j` end prefix.
fn element_nodal_columns(family: ResultFamily) -> &'static [&'static str] {
    match family {
        ResultFamily::ElementNodalBendingStrain => &["EPELDIR", "EPELByT", "EPELByB", "EPELBzT", "EPELBzB"],
        ResultFamily::ElementNodalForce => &["Fx", "My", "Mz", "Tq", "SFz", "SFy"],
        ResultFamily::ElementNodalStrain => &["Ex", "Ky", "Kz", "SEz", "SEy"],
        ResultFamily::ElementNodalStress => &["SDIR", "SByT", "SByB", "SBzT", "SBzB"],
        _ => &[],
    }
}

struct ElementNodalStrategy {
    family: ResultFamily,
}

impl ElementNodalStrategy {
    fn new(family: ResultFamily) -> Self {
        Self { family }
    }

    fn value(&self, v: &[f64], te: Option<f64>) -> ResultValue {
        match self.family {
            ResultFamily::ElementNodalBendingStrain => {
                ResultValue::ElementNodalBendingStrain(ElementNodalBendingStrain {
                    epel_dir: v[0],
                    epel_by_t: v[1],
                    epel_by_b: v[2],
                    epel_bz_t: v[3],
                    epel_bz_b: v[4],
                })
            }
            ResultFamily::ElementNodalForce => ResultValue::ElementNodalForces(ElementNodalForces {
                fx: v[0],
                my: v[1],
                mz: v[2],
                tq: v[3],
                sfz: v[4],
                sfy: v[5],
            }),
            ResultFamily::ElementNodalStrain => ResultValue::ElementNodalStrain(ElementNodalStrain {
                ex: v[0],
                ky: v[1],
                kz: v[2],
                sez: v[3],
                sey: v[4],
                te,
            }),
            _ => ResultValue::ElementNodalStress(ElementNodalStress {
                s_dir: v[0],
                s_by_t: v[1],
                s_by_b: v[2],
                s_bz_t: v[3],
                s_bz_b: v[4],
            }),
        }
    }
}

impl FamilyStrategy for ElementNodalStrategy {
    fn family(&self) -> ResultFamily {
        self.family
    }

    fn parse(
        &self,
        artifact: &Artifact<'_>,
        target: &ResultArtifact,
        mesh: &mut Mesh,
    ) -> IngestResult<Vec<ResultItem>> {
        let end = target.end.unwrap_or(ElementEnd::I);
        let prefix = end.column_prefix();
        let table = DelimitedTable::parse(artifact)?;
        let element_col = table.column(artifact, "ELEMENT")?;

        let names: Vec<String> = element_nodal_columns(self.family)
            .iter()
            .map(|c| format!("{prefix}{c}"))
            .collect();
        let cols = names
            .iter()
            .map(|name| table.column(artifact, name))
            .collect::<IngestResult<Vec<_>>>()?;
        let te_name = format!("{prefix}Te");
        let te_col = match self.family {
            ResultFamily::ElementNodalStrain => table.optional_column(&te_name),
            _ => None,
        };

        let mut items = Vec::with_capacity(table.rows().len());
        let mut values = Vec::with_capacity(cols.len());
        for row in table.rows() {
            let (element, node) = element_end(artifact, mesh, row.id(artifact, element_col, "ELEMENT")?, end)?;
            values.clear();
            for (col, name) in cols.iter().zip(&names) {
                values.push(row.number(artifact, *col, name)?);
            }
            let te = te_col
                .map(|col| row.number(artifact, col, &te_name))
                .transpose()?;
            items.push(ResultItem {
                classification: target.classification,
                location: ResultLocation::ElementNode { element, node },
                value: self.value(&values, te),
            });
        }
        Ok(items)
    }
}

fn element_end(
    artifact: &Artifact<'_>,
    mesh: &Mesh,
    element: fe_core::ElementId,
    end: ElementEnd,
) -> IngestResult<(fe_core::ElementId, fe_core::MeshNodeId)> {
    let beam = mesh.element(element).map_err(|e| artifact.mesh_error(e))?;
    Ok((element, beam.end_node(end)))
}

/// Code check, strain energy and the buckling summary.
struct OthersStrategy;

impl OthersStrategy {
    fn code_check(
        artifact: &Artifact<'_>,
        target: &ResultArtifact,
        mesh: &Mesh,
    ) -> IngestResult<Vec<ResultItem>> {
        let end = target.end.unwrap_or(ElementEnd::I);
        let table = DelimitedTable::parse(artifact)?;
        let element_col = table.column(artifact, "ELEMENT")?;
        let names = ["P_A", "M2_Z2", "M3_Z3", "SUM", "G_MAT_FY", "RATIO"];
        let mut cols = [0usize; 6];
        for (slot, name) in cols.iter_mut().zip(names) {
            *slot = table.column(artifact, name)?;
        }

        let mut items = Vec::with_capacity(table.rows().len());
        for row in table.rows() {
            let (element, node) = element_end(artifact, mesh, row.id(artifact, element_col, "ELEMENT")?, end)?;
            let mut v = [0.0; 6];
            for ((slot, col), name) in v.iter_mut().zip(cols).zip(names) {
                *slot = row.number(artifact, col, name)?;
            }
            items.push(ResultItem {
                classification: target.classification,
                location: ResultLocation::ElementNode { element, node },
                value: ResultValue::ElementNodalCodeCheck(ElementNodalCodeCheck {
                    p_a: v[0],
                    m2_z2: v[1],
                    m3_z3: v[2],
                    sum: v[3],
                    g_mat_fy: v[4],
                    ratio: v[5],
                }),
            });
        }
        Ok(items)
    }

    fn strain_energy(
        artifact: &Artifact<'_>,
        target: &ResultArtifact,
        mesh: &Mesh,
    ) -> IngestResult<Vec<ResultItem>> {
        let table = DelimitedTable::parse(artifact)?;
        let element_col = table.column(artifact, "ELEMENT")?;
        let energy_col = table.column(artifact, "e_StrEn")?;

        table
            .rows()
            .iter()
            .map(|row| {
                let element = row.id(artifact, element_col, "ELEMENT")?;
                mesh.element(element).map_err(|e| artifact.mesh_error(e))?;
                Ok(ResultItem {
                    classification: target.classification,
                    location: ResultLocation::Element { element },
                    value: ResultValue::ElementStrainEnergy {
                        strain_energy: row.number(artifact, energy_col, "e_StrEn")?,
                    },
                })
            })
            .collect()
    }
}

impl FamilyStrategy for OthersStrategy {
    fn family(&self) -> ResultFamily {
        ResultFamily::Others
    }

    fn parse(
        &self,
        artifact: &Artifact<'_>,
        target: &ResultArtifact,
        mesh: &mut Mesh,
    ) -> IngestResult<Vec<ResultItem>> {
        let result_type = target.classification.result_type;
        match result_type {
            ResultType::CodeCheck => Self::code_check(artifact, target, mesh),
            ResultType::StrainEnergy => Self::strain_energy(artifact, target, mesh),
            t if t.is_eigenvalue_buckling() => Ok(vec![ResultItem {
                classification: target.classification,
                location: ResultLocation::Model,
                value: ResultValue::EigenvalueBucklingSummary(eigen::eigenvalue_summary(artifact)?),
            }]),
            other => Err(IngestError::NoStrategy {
                family: other.as_str().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fe_core::EngineId;
    use fe_results::{AnalysisShape, MeshBeamElement, MeshNode};
    use std::path::Path;

    fn id(raw: u32) -> EngineId {
        EngineId::new(raw).unwrap()
    }

    fn two_node_mesh() -> Mesh {
        let mut mesh = Mesh::new();
        for raw in [1, 2] {
            mesh.insert_node(MeshNode {
                id: id(raw),
                x: raw as f64,
                y: 0.0,
                z: 0.0,
                thxy: 0.0,
                thyz: 0.0,
                thzx: 0.0,
            });
        }
        mesh.insert_element(MeshBeamElement {
            id: id(10),
            line: id(1),
            i_node: id(1),
            j_node: id(2),
            k_node: None,
        })
        .unwrap();
        mesh
    }

    fn target(t: ResultType, end: Option<ElementEnd>) -> ResultArtifact {
        ResultArtifact {
            classification: ResultClassification::new(t, AnalysisShape::Perfect),
            end,
        }
    }

    #[test]
    fn jnode_forces_land_on_the_j_node() {
        let registry = StrategyRegistry::ansys();
        let mut mesh = two_node_mesh();
        let text = "ELEMENT,jFx,jMy,jMz,jTq,jSFz,jSFy\n10,1.0,2.0,3.0,4.0,5.0,6.0\n";
        let artifact = Artifact::new("f_jnode.txt", Path::new("f_jnode.txt"), text);

        let items = registry
            .parse(&artifact, &target(ResultType::ElementForceFx, Some(ElementEnd::J)), &mut mesh)
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].location,
            ResultLocation::ElementNode {
                element: id(10),
                node: id(2)
            }
        );
        assert_eq!(items[0].value.component(ResultType::ElementForceSFy), Some(6.0));
        assert_eq!(items[0].value.component(ResultType::ElementForceTq), Some(4.0));
    }

    #[test]
    fn code_check_jnode_uses_j_end() {
        let registry = StrategyRegistry::ansys();
        let mut mesh = two_node_mesh();
        let text = "ELEMENT,P_A,M2_Z2,M3_Z3,SUM,G_MAT_FY,RATIO\n10,1,2,3,6,300,0.02\n";
        let artifact = Artifact::new("c_jnode.txt", Path::new("c_jnode.txt"), text);

        let items = registry
            .parse(&artifact, &target(ResultType::CodeCheck, Some(ElementEnd::J)), &mut mesh)
            .unwrap();
        assert!(matches!(
            items[0].location,
            ResultLocation::ElementNode { node, .. } if node == id(2)
        ));
        assert_eq!(items[0].value.component(ResultType::CodeCheck), Some(0.02));
    }

    #[test]
    fn strain_torsion_column_is_optional() {
        let registry = StrategyRegistry::ansys();
        let mut mesh = two_node_mesh();
        let with_te = "ELEMENT,iEx,iKy,iKz,iSEz,iSEy,iTe\n10,1,2,3,4,5,6\n";
        let without_te = "ELEMENT,iEx,iKy,iKz,iSEz,iSEy\n10,1,2,3,4,5\n";
        let t = target(ResultType::ElementStrainEx, Some(ElementEnd::I));

        let a = Artifact::new("s.txt", Path::new("s.txt"), with_te);
        let items = registry.parse(&a, &t, &mut mesh).unwrap();
        assert_eq!(items[0].value.component(ResultType::ElementStrainTe), Some(6.0));

        let b = Artifact::new("s.txt", Path::new("s.txt"), without_te);
        let items = registry.parse(&b, &t, &mut mesh).unwrap();
        assert_eq!(items[0].value.component(ResultType::ElementStrainTe), None);
        assert_eq!(items[0].value.component(ResultType::ElementStrainSEy), Some(5.0));
    }

    #[test]
    fn section_rows_create_section_nodes() {
        let registry = StrategyRegistry::ansys();
        let mut mesh = two_node_mesh();
        let text = " ELEMENT = 10 SECTION PT. = 1\n ELEMENT NODE = 2\n      1  1.0  2.0  3.0  4.0  5.0\n      2  1.5  2.5  3.5  4.5  5.5\n";
        let artifact = Artifact::new("sec.txt", Path::new("sec.txt"), text);

        let items = registry
            .parse(&artifact, &target(ResultType::SectionNodeStrainEptt1, None), &mut mesh)
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(mesh.section_node_count(), 2);
        assert_eq!(items[1].value.component(ResultType::SectionNodeStrainEpttEqv), Some(5.5));
    }

    #[test]
    fn unknown_element_is_a_mesh_reference_error() {
        let registry = StrategyRegistry::ansys();
        let mut mesh = two_node_mesh();
        let text = "ELEMENT,e_StrEn\n99,1.0\n";
        let artifact = Artifact::new("energy.txt", Path::new("energy.txt"), text);

        match registry.parse(&artifact, &target(ResultType::StrainEnergy, None), &mut mesh) {
            Err(IngestError::MissingMeshReference { file, what, id }) => {
                assert_eq!(file, "energy.txt");
                assert_eq!(what, "beam element");
                assert_eq!(id, "99");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn replacing_a_strategy() {
        struct Silent;
        impl FamilyStrategy for Silent {
            fn family(&self) -> ResultFamily {
                ResultFamily::NodalReaction
            }
            fn parse(
                &self,
                _: &Artifact<'_>,
                _: &ResultArtifact,
                _: &mut Mesh,
            ) -> IngestResult<Vec<ResultItem>> {
                Ok(Vec::new())
            }
        }

        let mut registry = StrategyRegistry::ansys();
        assert!(registry.register(Box::new(Silent)).is_some());
        let mut mesh = two_node_mesh();
        let artifact = Artifact::new("r.txt", Path::new("r.txt"), " garbage");
        let items = registry
            .parse(&artifact, &target(ResultType::NodalReactionFx, None), &mut mesh)
            .unwrap();
        assert!(items.is_empty());
    }
}
