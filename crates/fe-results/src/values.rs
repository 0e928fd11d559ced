//! Typed result records, one shape per result family.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::taxonomy::ResultType;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodalReactions {
    pub fx: Option<f64>,
    pub fy: Option<f64>,
    pub fz: Option<f64>,
    pub mx: Option<f64>,
    pub my: Option<f64>,
    pub mz: Option<f64>,
}

impl NodalReactions {
    pub fn contains_any_value(&self) -> bool {
        [self.fx, self.fy, self.fz, self.mx, self.my, self.mz]
            .iter()
            .any(Option::is_some)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodalDisplacements {
    pub ux: f64,
    pub uy: f64,
    pub uz: f64,
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
}

impl NodalDisplacements {
    pub fn u_total(&self) -> f64 {
        (self.ux * self.ux + self.uy * self.uy + self.uz * self.uz).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionNodalStress {
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
    pub sint: f64,
    pub seqv: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionNodalStrain {
    pub eptt1: f64,
    pub eptt2: f64,
    pub eptt3: f64,
    pub epttint: f64,
    pub eptteqv: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementNodalBendingStrain {
    pub epel_dir: f64,
    pub epel_by_t: f64,
    pub epel_by_b: f64,
    pub epel_bz_t: f64,
    pub epel_bz_b: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementNodalForces {
    pub fx: f64,
    pub my: f64,
    pub mz: f64,
    pub tq: f64,
    pub sfz: f64,
    pub sfy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementNodalStrain {
    pub ex: f64,
    pub ky: f64,
    pub kz: f64,
    pub sez: f64,
    pub sey: f64,
    /// Torsional strain; not every listing carries it.
    pub te: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementNodalStress {
    pub s_dir: f64,
    pub s_by_t: f64,
    pub s_by_b: f64,
    pub s_bz_t: f64,
    pub s_bz_b: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementNodalCodeCheck {
    pub p_a: f64,
    pub m2_z2: f64,
    pub m3_z3: f64,
    pub sum: f64,
    pub g_mat_fy: f64,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EigenvalueBucklingSummary {
    /// Serialized as `[mode, multiplier]` pairs so it reads back inside the
    /// tagged `ResultValue`.
    #[serde(with = "mode_pairs")]
    pub multipliers: BTreeMap<u32, f64>,
}

mod mode_pairs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(map: &BTreeMap<u32, f64>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<u32, f64>, D::Error> {
        let pairs = Vec::<(u32, f64)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

impl EigenvalueBucklingSummary {
    pub fn is_empty(&self) -> bool {
        self.multipliers.is_empty()
    }

    /// Multipliers at or above zero, in mode order.
    pub fn non_negative_multipliers(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.multipliers
            .iter()
            .filter(|(_, m)| **m >= 0.0)
            .map(|(mode, m)| (*mode, *m))
    }

    /// The `n`-th (1-based) strictly positive multiplier.
    pub fn nth_positive(&self, n: usize) -> Option<f64> {
        if n == 0 {
            return None;
        }
        self.multipliers
            .values()
            .copied()
            .filter(|m| *m > 0.0)
            .nth(n - 1)
    }
}

/// Family-specific value of one result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ResultValue {
    NodalReactions(NodalReactions),
    NodalDisplacements(NodalDisplacements),
    SectionNodalStress(SectionNodalStress),
    SectionNodalStrain(SectionNodalStrain),
    ElementNodalBendingStrain(ElementNodalBendingStrain),
    ElementNodalForces(ElementNodalForces),
    ElementNodalStrain(ElementNodalStrain),
    ElementNodalStress(ElementNodalStress),
    ElementNodalCodeCheck(ElementNodalCodeCheck),
    ElementStrainEnergy { strain_energy: f64 },
    EigenvalueBucklingSummary(EigenvalueBucklingSummary),
}

impl ResultValue {
    /// Scalar component matching `result_type`, if this value carries it.
    pub fn component(&self, result_type: ResultType) -> Option<f64> {
        use ResultType as T;
        match (self, result_type) {
            (ResultValue::NodalReactions(v), T::NodalReactionFx) => v.fx,
            (ResultValue::NodalReactions(v), T::NodalReactionFy) => v.fy,
            (ResultValue::NodalReactions(v), T::NodalReactionFz) => v.fz,
            (ResultValue::NodalReactions(v), T::NodalReactionMx) => v.mx,
            (ResultValue::NodalReactions(v), T::NodalReactionMy) => v.my,
            (ResultValue::NodalReactions(v), T::NodalReactionMz) => v.mz,

            (ResultValue::NodalDisplacements(v), T::NodalDisplacementUx) => Some(v.ux),
            (ResultValue::NodalDisplacements(v), T::NodalDisplacementUy) => Some(v.uy),
            (ResultValue::NodalDisplacements(v), T::NodalDisplacementUz) => Some(v.uz),
            (ResultValue::NodalDisplacements(v), T::NodalDisplacementRx) => Some(v.rx),
            (ResultValue::NodalDisplacements(v), T::NodalDisplacementRy) => Some(v.ry),
            (ResultValue::NodalDisplacements(v), T::NodalDisplacementRz) => Some(v.rz),
            (ResultValue::NodalDisplacements(v), T::NodalDisplacementUTotal) => Some(v.u_total()),

            (ResultValue::SectionNodalStress(v), T::SectionNodeStressS1) => Some(v.s1),
            (ResultValue::SectionNodalStress(v), T::SectionNodeStressS2) => Some(v.s2),
            (ResultValue::SectionNodalStress(v), T::SectionNodeStressS3) => Some(v.s3),
            (ResultValue::SectionNodalStress(v), T::SectionNodeStressSInt) => Some(v.sint),
            (ResultValue::SectionNodalStress(v), T::SectionNodeStressSEqv) => Some(v.seqv),

            (ResultValue::SectionNodalStrain(v), T::SectionNodeStrainEptt1) => Some(v.eptt1),
            (ResultValue::SectionNodalStrain(v), T::SectionNodeStrainEptt2) => Some(v.eptt2),
            (ResultValue::SectionNodalStrain(v), T::SectionNodeStrainEptt3) => Some(v.eptt3),
            (ResultValue::SectionNodalStrain(v), T::SectionNodeStrainEpttInt) => Some(v.epttint),
            (ResultValue::SectionNodalStrain(v), T::SectionNodeStrainEpttEqv) => Some(v.eptteqv),

            (ResultValue::ElementNodalBendingStrain(v), T::BendingStrainEpelDir) => {
                Some(v.epel_dir)
            }
            (ResultValue::ElementNodalBendingStrain(v), T::BendingStrainEpelByT) => {
                Some(v.epel_by_t)
            }
            (ResultValue::ElementNodalBendingStrain(v), T::BendingStrainEpelByB) => {
                Some(v.epel_by_b)
            }
            (ResultValue::ElementNodalBendingStrain(v), T::BendingStrainEpelBzT) => {
                Some(v.epel_bz_t)
            }
            (ResultValue::ElementNodalBendingStrain(v), T::BendingStrainEpelBzB) => {
                Some(v.epel_bz_b)
            }

            (ResultValue::ElementNodalForces(v), T::ElementForceFx) => Some(v.fx),
            (ResultValue::ElementNodalForces(v), T::ElementForceSFy) => Some(v.sfy),
            (ResultValue::ElementNodalForces(v), T::ElementForceSFz) => Some(v.sfz),
            (ResultValue::ElementNodalForces(v), T::ElementForceTq) => Some(v.tq),
            (ResultValue::ElementNodalForces(v), T::ElementForceMy) => Some(v.my),
            (ResultValue::ElementNodalForces(v), T::ElementForceMz) => Some(v.mz),

            (ResultValue::ElementNodalStrain(v), T::ElementStrainEx) => Some(v.ex),
            (ResultValue::ElementNodalStrain(v), T::ElementStrainKy) => Some(v.ky),
            (ResultValue::ElementNodalStrain(v), T::ElementStrainKz) => Some(v.kz),
            (ResultValue::ElementNodalStrain(v), T::ElementStrainSEz) => Some(v.sez),
            (ResultValue::ElementNodalStrain(v), T::ElementStrainSEy) => Some(v.sey),
            (ResultValue::ElementNodalStrain(v), T::ElementStrainTe) => v.te,

            (ResultValue::ElementNodalStress(v), T::ElementStressSDir) => Some(v.s_dir),
            (ResultValue::ElementNodalStress(v), T::ElementStressSByT) => Some(v.s_by_t),
            (ResultValue::ElementNodalStress(v), T::ElementStressSByB) => Some(v.s_by_b),
            (ResultValue::ElementNodalStress(v), T::ElementStressSBzT) => Some(v.s_bz_t),
            (ResultValue::ElementNodalStress(v), T::ElementStressSBzB) => Some(v.s_bz_b),

            (ResultValue::ElementNodalCodeCheck(v), T::CodeCheck) => Some(v.ratio),
            (ResultValue::ElementStrainEnergy { strain_energy }, T::StrainEnergy) => {
                Some(*strain_energy)
            }
            (ResultValue::EigenvalueBucklingSummary(v), t) => t
                .buckling_mode()
                .and_then(|mode| v.multipliers.get(&mode).copied()),

            _ => None,
        }
    }
}
