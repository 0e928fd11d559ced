//! Derivation of the analysis stages a selection needs.

use serde::{Deserialize, Serialize};

use crate::taxonomy::{AnalysisShape, ResultClassification};

/// Which optional sub-analyses the generated script must contain.
///
/// Perfect-shape static analysis is not listed: it always runs because it
/// also produces the base mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AnalysisRequirements {
    pub perfect_eigenvalue_buckling: bool,
    pub imperfect_full_stiffness_static: bool,
    pub imperfect_full_stiffness_eigenvalue_buckling: bool,
    pub imperfect_softened_static: bool,
    pub imperfect_softened_eigenvalue_buckling: bool,
}

impl AnalysisRequirements {
    pub fn perfect_static(&self) -> bool {
        true
    }

    /// Imperfect geometry must be derived from a perfect-shape buckling mode.
    pub fn any_imperfect(&self) -> bool {
        self.imperfect_full_stiffness_static || self.imperfect_softened_static
    }

    pub fn static_required(&self, shape: AnalysisShape) -> bool {
        match shape {
            AnalysisShape::Perfect => true,
            AnalysisShape::ImperfectFullStiffness => self.imperfect_full_stiffness_static,
            AnalysisShape::ImperfectSoftened => self.imperfect_softened_static,
        }
    }

    pub fn eigenvalue_buckling_required(&self, shape: AnalysisShape) -> bool {
        match shape {
            AnalysisShape::Perfect => self.perfect_eigenvalue_buckling,
            AnalysisShape::ImperfectFullStiffness => {
                self.imperfect_full_stiffness_eigenvalue_buckling
            }
            AnalysisShape::ImperfectSoftened => self.imperfect_softened_eigenvalue_buckling,
        }
    }
}

/// Pure reducer from the selected classifications to the required stages.
pub fn recompute<'a, I>(selected: I) -> AnalysisRequirements
where
    I: IntoIterator<Item = &'a ResultClassification>,
{
    let mut req = AnalysisRequirements::default();
    let mut perfect_eigen_selected = false;

    for c in selected {
        let eigen = c.is_eigenvalue_buckling();
        match c.shape {
            AnalysisShape::Perfect => perfect_eigen_selected |= eigen,
            AnalysisShape::ImperfectFullStiffness => {
                req.imperfect_full_stiffness_static = true;
                req.imperfect_full_stiffness_eigenvalue_buckling |= eigen;
            }
            AnalysisShape::ImperfectSoftened => {
                req.imperfect_softened_static = true;
                req.imperfect_softened_eigenvalue_buckling |= eigen;
            }
        }
    }

    req.perfect_eigenvalue_buckling = perfect_eigen_selected || req.any_imperfect();
    req
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::ResultType;

    #[test]
    fn empty_selection_only_runs_perfect_static() {
        let req = recompute(&[]);
        assert_eq!(req, AnalysisRequirements::default());
        assert!(req.perfect_static());
    }

    #[test]
    fn perfect_displacement_needs_nothing_else() {
        let selected = [ResultClassification::new(
            ResultType::NodalDisplacementUx,
            AnalysisShape::Perfect,
        )];
        let req = recompute(&selected);
        assert!(!req.perfect_eigenvalue_buckling);
        assert!(!req.imperfect_full_stiffness_static);
        assert!(!req.imperfect_full_stiffness_eigenvalue_buckling);
        assert!(!req.imperfect_softened_static);
        assert!(!req.imperfect_softened_eigenvalue_buckling);
    }

    #[test]
    fn softened_mode_factor_pulls_in_perfect_buckling() {
        let selected = [ResultClassification::new(
            ResultType::EigenvalueBucklingMode1Factor,
            AnalysisShape::ImperfectSoftened,
        )];
        let req = recompute(&selected);
        assert!(req.imperfect_softened_static);
        assert!(req.imperfect_softened_eigenvalue_buckling);
        assert!(req.perfect_eigenvalue_buckling);
        assert!(!req.imperfect_full_stiffness_static);
    }

    #[test]
    fn perfect_mode_factor_only_adds_perfect_buckling() {
        let selected = [ResultClassification::new(
            ResultType::EigenvalueBucklingMode2Factor,
            AnalysisShape::Perfect,
        )];
        let req = recompute(&selected);
        assert!(req.perfect_eigenvalue_buckling);
        assert!(!req.any_imperfect());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::taxonomy::catalog;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn selection() -> impl Strategy<Value = BTreeSet<ResultClassification>> {
        let all = catalog();
        proptest::collection::btree_set(proptest::sample::select(all), 0..24)
    }

    proptest! {
        #[test]
        fn recompute_is_deterministic(selected in selection()) {
            prop_assert_eq!(recompute(&selected), recompute(&selected));
        }

        #[test]
        fn add_then_remove_restores(
            selected in selection(),
            extra in proptest::sample::select(catalog()),
        ) {
            let before = recompute(&selected);
            let mut changed = selected.clone();
            let inserted = changed.insert(extra);
            if inserted {
                changed.remove(&extra);
            }
            prop_assert_eq!(recompute(&changed), before);
        }

        #[test]
        fn full_stiffness_implies_perfect_buckling(selected in selection()) {
            let req = recompute(&selected);
            let has_full = selected
                .iter()
                .any(|c| c.shape == AnalysisShape::ImperfectFullStiffness);
            if has_full {
                prop_assert!(req.imperfect_full_stiffness_static);
                prop_assert!(req.perfect_eigenvalue_buckling);
            }
            // An imperfect eigen stage never runs without its static stage.
            prop_assert!(!req.imperfect_softened_eigenvalue_buckling || req.imperfect_softened_static);
        }
    }
}
