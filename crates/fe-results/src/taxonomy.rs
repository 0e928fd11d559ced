//! Static catalog of result quantities.
//!
//! A [`ResultClassification`] is a (quantity, shape) pair. The catalog is the
//! full cross product of [`ResultType::ALL`] and [`AnalysisShape::ALL`]; the
//! wire names returned by `as_str` are the ones the engine writes into file
//! names, so they must not change.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ResultsError;

/// Structural configuration a result is computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnalysisShape {
    #[serde(rename = "PerfectShape")]
    Perfect,
    #[serde(rename = "ImperfectShape_FullStiffness")]
    ImperfectFullStiffness,
    #[serde(rename = "ImperfectShape_Softened")]
    ImperfectSoftened,
}

impl AnalysisShape {
    pub const ALL: [AnalysisShape; 3] = [
        AnalysisShape::Perfect,
        AnalysisShape::ImperfectFullStiffness,
        AnalysisShape::ImperfectSoftened,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisShape::Perfect => "PerfectShape",
            AnalysisShape::ImperfectFullStiffness => "ImperfectShape_FullStiffness",
            AnalysisShape::ImperfectSoftened => "ImperfectShape_Softened",
        }
    }

    pub fn is_imperfect(self) -> bool {
        !matches!(self, AnalysisShape::Perfect)
    }
}

/// Groups result types that share one extraction mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResultFamily {
    #[serde(rename = "Nodal_Reaction")]
    NodalReaction,
    #[serde(rename = "Nodal_Displacement")]
    NodalDisplacement,
    #[serde(rename = "SectionNode_Stress")]
    SectionNodeStress,
    #[serde(rename = "SectionNode_Strain")]
    SectionNodeStrain,
    #[serde(rename = "ElementNodal_BendingStrain")]
    ElementNodalBendingStrain,
    #[serde(rename = "ElementNodal_Force")]
    ElementNodalForce,
    #[serde(rename = "ElementNodal_Strain")]
    ElementNodalStrain,
    #[serde(rename = "ElementNodal_Stress")]
    ElementNodalStress,
    Others,
}

impl ResultFamily {
    pub const ALL: [ResultFamily; 9] = [
        ResultFamily::NodalReaction,
        ResultFamily::NodalDisplacement,
        ResultFamily::SectionNodeStress,
        ResultFamily::SectionNodeStrain,
        ResultFamily::ElementNodalBendingStrain,
        ResultFamily::ElementNodalForce,
        ResultFamily::ElementNodalStrain,
        ResultFamily::ElementNodalStress,
        ResultFamily::Others,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResultFamily::NodalReaction => "Nodal_Reaction",
            ResultFamily::NodalDisplacement => "Nodal_Displacement",
            ResultFamily::SectionNodeStress => "SectionNode_Stress",
            ResultFamily::SectionNodeStrain => "SectionNode_Strain",
            ResultFamily::ElementNodalBendingStrain => "ElementNodal_BendingStrain",
            ResultFamily::ElementNodalForce => "ElementNodal_Force",
            ResultFamily::ElementNodalStrain => "ElementNodal_Strain",
            ResultFamily::ElementNodalStress => "ElementNodal_Stress",
            ResultFamily::Others => "Others",
        }
    }

    /// Element-nodal listings come as an `_inode` and a `_jnode` file.
    pub fn is_element_nodal(self) -> bool {
        matches!(
            self,
            ResultFamily::ElementNodalBendingStrain
                | ResultFamily::ElementNodalForce
                | ResultFamily::ElementNodalStrain
                | ResultFamily::ElementNodalStress
        )
    }
}

/// Kind of mesh location a result value is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultLocationKind {
    Model,
    Node,
    ElementNode,
    SectionNode,
    Element,
}

macro_rules! result_types {
    ($($variant:ident => $name:literal, $family:ident, $location:ident;)+) => {
        /// Enumerated result quantity.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum ResultType {
            $(
                #[serde(rename = $name)]
                $variant,
            )+
        }

        impl ResultType {
            pub const ALL: &'static [ResultType] = &[$(ResultType::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(ResultType::$variant => $name,)+
                }
            }

            pub fn family(self) -> ResultFamily {
                match self {
                    $(ResultType::$variant => ResultFamily::$family,)+
                }
            }

            pub fn location(self) -> ResultLocationKind {
                match self {
                    $(ResultType::$variant => ResultLocationKind::$location,)+
                }
            }
        }
    };
}

result_types! {
    NodalReactionFx => "Nodal_Reaction_Fx", NodalReaction, Node;
    NodalReactionFy => "Nodal_Reaction_Fy", NodalReaction, Node;
    NodalReactionFz => "Nodal_Reaction_Fz", NodalReaction, Node;
    NodalReactionMx => "Nodal_Reaction_Mx", NodalReaction, Node;
    NodalReactionMy => "Nodal_Reaction_My", NodalReaction, Node;
    NodalReactionMz => "Nodal_Reaction_Mz", NodalReaction, Node;

    NodalDisplacementUx => "Nodal_Displacement_Ux", NodalDisplacement, Node;
    NodalDisplacementUy => "Nodal_Displacement_Uy", NodalDisplacement, Node;
    NodalDisplacementUz => "Nodal_Displacement_Uz", NodalDisplacement, Node;
    NodalDisplacementRx => "Nodal_Displacement_Rx", NodalDisplacement, Node;
    NodalDisplacementRy => "Nodal_Displacement_Ry", NodalDisplacement, Node;
    NodalDisplacementRz => "Nodal_Displacement_Rz", NodalDisplacement, Node;
    NodalDisplacementUTotal => "Nodal_Displacement_UTotal", NodalDisplacement, Node;

    SectionNodeStressS1 => "SectionNode_Stress_S1", SectionNodeStress, SectionNode;
    SectionNodeStressS2 => "SectionNode_Stress_S2", SectionNodeStress, SectionNode;
    SectionNodeStressS3 => "SectionNode_Stress_S3", SectionNodeStress, SectionNode;
    SectionNodeStressSInt => "SectionNode_Stress_SInt", SectionNodeStress, SectionNode;
    SectionNodeStressSEqv => "SectionNode_Stress_SEqv", SectionNodeStress, SectionNode;

    SectionNodeStrainEptt1 => "SectionNode_Strain_EPTT1", SectionNodeStrain, SectionNode;
    SectionNodeStrainEptt2 => "SectionNode_Strain_EPTT2", SectionNodeStrain, SectionNode;
    SectionNodeStrainEptt3 => "SectionNode_Strain_EPTT3", SectionNodeStrain, SectionNode;
    SectionNodeStrainEpttInt => "SectionNode_Strain_EPTTInt", SectionNodeStrain, SectionNode;
    SectionNodeStrainEpttEqv => "SectionNode_Strain_EPTTEqv", SectionNodeStrain, SectionNode;

    BendingStrainEpelDir => "ElementNodal_BendingStrain_EPELDIR", ElementNodalBendingStrain, ElementNode;
    BendingStrainEpelByT => "ElementNodal_BendingStrain_EPELByT", ElementNodalBendingStrain, ElementNode;
    BendingStrainEpelByB => "ElementNodal_BendingStrain_EPELByB", ElementNodalBendingStrain, ElementNode;
    BendingStrainEpelBzT => "ElementNodal_BendingStrain_EPELBzT", ElementNodalBendingStrain, ElementNode;
    BendingStrainEpelBzB => "ElementNodal_BendingStrain_EPELBzB", ElementNodalBendingStrain, ElementNode;

    ElementForceFx => "ElementNodal_Force_Fx", ElementNodalForce, ElementNode;
    ElementForceSFy => "ElementNodal_Force_SFy", ElementNodalForce, ElementNode;
    ElementForceSFz => "ElementNodal_Force_SFz", ElementNodalForce, ElementNode;
    ElementForceTq => "ElementNodal_Force_Tq", ElementNodalForce, ElementNode;
    ElementForceMy => "ElementNodal_Force_My", ElementNodalForce, ElementNode;
    ElementForceMz => "ElementNodal_Force_Mz", ElementNodalForce, ElementNode;

    ElementStrainEx => "ElementNodal_Strain_Ex", ElementNodalStrain, ElementNode;
    ElementStrainKy => "ElementNodal_Strain_Ky", ElementNodalStrain, ElementNode;
    ElementStrainKz => "ElementNodal_Strain_Kz", ElementNodalStrain, ElementNode;
    ElementStrainSEz => "ElementNodal_Strain_SEz", ElementNodalStrain, ElementNode;
    ElementStrainSEy => "ElementNodal_Strain_SEy", ElementNodalStrain, ElementNode;
    ElementStrainTe => "ElementNodal_Strain_Te", ElementNodalStrain, ElementNode;

    ElementStressSDir => "ElementNodal_Stress_SDir", ElementNodalStress, ElementNode;
    ElementStressSByT => "ElementNodal_Stress_SByT", ElementNodalStress, ElementNode;
    ElementStressSByB => "ElementNodal_Stress_SByB", ElementNodalStress, ElementNode;
    ElementStressSBzT => "ElementNodal_Stress_SBzT", ElementNodalStress, ElementNode;
    ElementStressSBzB => "ElementNodal_Stress_SBzB", ElementNodalStress, ElementNode;

    CodeCheck => "ElementNodal_CodeCheck", Others, ElementNode;
    StrainEnergy => "Element_StrainEnergy", Others, Element;
    EigenvalueBucklingMode1Factor => "Model_EigenvalueBuckling_Mode1Factor", Others, Model;
    EigenvalueBucklingMode2Factor => "Model_EigenvalueBuckling_Mode2Factor", Others, Model;
    EigenvalueBucklingMode3Factor => "Model_EigenvalueBuckling_Mode3Factor", Others, Model;
}

impl ResultType {
    pub fn is_eigenvalue_buckling(self) -> bool {
        matches!(
            self,
            ResultType::EigenvalueBucklingMode1Factor
                | ResultType::EigenvalueBucklingMode2Factor
                | ResultType::EigenvalueBucklingMode3Factor
        )
    }

    /// Buckling mode number for the eigenvalue factor types.
    pub fn buckling_mode(self) -> Option<u32> {
        match self {
            ResultType::EigenvalueBucklingMode1Factor => Some(1),
            ResultType::EigenvalueBucklingMode2Factor => Some(2),
            ResultType::EigenvalueBucklingMode3Factor => Some(3),
            _ => None,
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultType {
    type Err = ResultsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResultType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ResultsError::UnknownName {
                kind: "result type",
                name: s.to_string(),
            })
    }
}

impl fmt::Display for AnalysisShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisShape {
    type Err = ResultsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisShape::ALL
            .iter()
            .copied()
            .find(|shape| shape.as_str() == s)
            .ok_or_else(|| ResultsError::UnknownName {
                kind: "analysis shape",
                name: s.to_string(),
            })
    }
}

impl fmt::Display for ResultFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultFamily {
    type Err = ResultsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResultFamily::ALL
            .iter()
            .copied()
            .find(|family| family.as_str() == s)
            .ok_or_else(|| ResultsError::UnknownName {
                kind: "result family",
                name: s.to_string(),
            })
    }
}

/// Engine identity, used only to filter supported classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SolverBackend {
    #[default]
    Ansys,
    Sap2000,
}

impl SolverBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            SolverBackend::Ansys => "Ansys",
            SolverBackend::Sap2000 => "Sap2000",
        }
    }

    pub fn supports(self, classification: ResultClassification) -> bool {
        match self {
            SolverBackend::Ansys => true,
            SolverBackend::Sap2000 => {
                classification.shape == AnalysisShape::Perfect
                    && matches!(
                        classification.family(),
                        ResultFamily::NodalReaction | ResultFamily::NodalDisplacement
                    )
            }
        }
    }
}

/// Camera direction appended to screenshot artifact names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViewDirection {
    #[serde(rename = "Top_Towards_ZNeg")]
    TopTowardsZNeg,
    #[serde(rename = "Front_Towards_YPos")]
    FrontTowardsYPos,
    #[serde(rename = "Back_Towards_YNeg")]
    BackTowardsYNeg,
    #[serde(rename = "Right_Towards_XNeg")]
    RightTowardsXNeg,
    #[serde(rename = "Left_Towards_XPos")]
    LeftTowardsXPos,
    #[serde(rename = "Perspective_Top_Front_Edge")]
    PerspectiveTopFrontEdge,
    #[serde(rename = "Perspective_Top_Back_Edge")]
    PerspectiveTopBackEdge,
    #[serde(rename = "Perspective_Top_Right_Edge")]
    PerspectiveTopRightEdge,
    #[serde(rename = "Perspective_Top_Left_Edge")]
    PerspectiveTopLeftEdge,
    #[serde(rename = "Perspective_TFR_Corner")]
    PerspectiveTfrCorner,
    #[serde(rename = "Perspective_TFL_Corner")]
    PerspectiveTflCorner,
    #[serde(rename = "Perspective_TBR_Corner")]
    PerspectiveTbrCorner,
    #[serde(rename = "Perspective_TBL_Corner")]
    PerspectiveTblCorner,
}

impl ViewDirection {
    pub const ALL: [ViewDirection; 13] = [
        ViewDirection::TopTowardsZNeg,
        ViewDirection::FrontTowardsYPos,
        ViewDirection::BackTowardsYNeg,
        ViewDirection::RightTowardsXNeg,
        ViewDirection::LeftTowardsXPos,
        ViewDirection::PerspectiveTopFrontEdge,
        ViewDirection::PerspectiveTopBackEdge,
        ViewDirection::PerspectiveTopRightEdge,
        ViewDirection::PerspectiveTopLeftEdge,
        ViewDirection::PerspectiveTfrCorner,
        ViewDirection::PerspectiveTflCorner,
        ViewDirection::PerspectiveTbrCorner,
        ViewDirection::PerspectiveTblCorner,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewDirection::TopTowardsZNeg => "Top_Towards_ZNeg",
            ViewDirection::FrontTowardsYPos => "Front_Towards_YPos",
            ViewDirection::BackTowardsYNeg => "Back_Towards_YNeg",
            ViewDirection::RightTowardsXNeg => "Right_Towards_XNeg",
            ViewDirection::LeftTowardsXPos => "Left_Towards_XPos",
            ViewDirection::PerspectiveTopFrontEdge => "Perspective_Top_Front_Edge",
            ViewDirection::PerspectiveTopBackEdge => "Perspective_Top_Back_Edge",
            ViewDirection::PerspectiveTopRightEdge => "Perspective_Top_Right_Edge",
            ViewDirection::PerspectiveTopLeftEdge => "Perspective_Top_Left_Edge",
            ViewDirection::PerspectiveTfrCorner => "Perspective_TFR_Corner",
            ViewDirection::PerspectiveTflCorner => "Perspective_TFL_Corner",
            ViewDirection::PerspectiveTbrCorner => "Perspective_TBR_Corner",
            ViewDirection::PerspectiveTblCorner => "Perspective_TBL_Corner",
        }
    }
}

impl FromStr for ViewDirection {
    type Err = ResultsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewDirection::ALL
            .iter()
            .copied()
            .find(|dir| dir.as_str() == s)
            .ok_or_else(|| ResultsError::UnknownName {
                kind: "view direction",
                name: s.to_string(),
            })
    }
}

/// A (quantity, shape) pair the user may request as output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResultClassification {
    pub result_type: ResultType,
    pub shape: AnalysisShape,
}

impl ResultClassification {
    pub fn new(result_type: ResultType, shape: AnalysisShape) -> Self {
        Self { result_type, shape }
    }

    pub fn family(self) -> ResultFamily {
        self.result_type.family()
    }

    pub fn location(self) -> ResultLocationKind {
        self.result_type.location()
    }

    pub fn is_eigenvalue_buckling(self) -> bool {
        self.result_type.is_eigenvalue_buckling()
    }

    /// Selected when a project does not list any results.
    pub fn is_default_selected(self) -> bool {
        self.shape == AnalysisShape::Perfect
            && self.result_type == ResultType::NodalDisplacementUTotal
    }

    /// Output file stem (no extension) written by the engine for this result.
    pub fn output_stem(self) -> String {
        match self.family() {
            ResultFamily::Others => format!(
                "ems_output_{}_{}_{}",
                self.shape.as_str(),
                self.family().as_str(),
                self.result_type.as_str()
            ),
            family => format!("ems_output_{}_{}", self.shape.as_str(), family.as_str()),
        }
    }

    /// Screenshot stem; the engine appends `_{ViewDirection}.png`.
    pub fn screenshot_stem(self) -> String {
        format!(
            "ems_image_{}_{}",
            self.shape.as_str(),
            self.result_type.as_str()
        )
    }
}

impl fmt::Display for ResultClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.result_type, self.shape)
    }
}

/// Every classification, shape-major in declaration order.
pub fn catalog() -> Vec<ResultClassification> {
    AnalysisShape::ALL
        .iter()
        .flat_map(|&shape| {
            ResultType::ALL
                .iter()
                .map(move |&result_type| ResultClassification::new(result_type, shape))
        })
        .collect()
}

/// Catalog entries supported by `backend`.
pub fn supported_catalog(backend: SolverBackend) -> Vec<ResultClassification> {
    catalog()
        .into_iter()
        .filter(|c| backend.supports(*c))
        .collect()
}
