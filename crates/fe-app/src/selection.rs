//! Result selection state.
//!
//! Every mutation recomputes the analysis requirements before returning,
//! so `requirements()` always matches the current selection.

use std::collections::BTreeSet;

use fe_project::{Project, ResultSelectionDef};
use fe_results::{
    AnalysisRequirements, AnalysisShape, ResultClassification, ResultFamily, SolverBackend,
    recompute, supported_catalog,
};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct Selection {
    backend: SolverBackend,
    selected: BTreeSet<ResultClassification>,
    requirements: AnalysisRequirements,
}

impl Selection {
    /// Empty selection for `backend`.
    pub fn new(backend: SolverBackend) -> Self {
        Self {
            backend,
            selected: BTreeSet::new(),
            requirements: AnalysisRequirements::default(),
        }
    }

    /// The project's listed results, or the default selection.
    pub fn from_project(project: &Project) -> AppResult<Self> {
        let mut selection = Self::new(project.engine.backend);
        for classification in project.selection() {
            selection.select(classification)?;
        }
        Ok(selection)
    }

    pub fn backend(&self) -> SolverBackend {
        self.backend
    }

    pub fn requirements(&self) -> &AnalysisRequirements {
        &self.requirements
    }

    pub fn is_selected(&self, classification: ResultClassification) -> bool {
        self.selected.contains(&classification)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected classifications in a stable order.
    pub fn classifications(&self) -> Vec<ResultClassification> {
        self.selected.iter().copied().collect()
    }

    pub fn select(&mut self, classification: ResultClassification) -> AppResult<()> {
        self.check_supported(classification)?;
        if self.selected.insert(classification) {
            self.recompute();
        }
        Ok(())
    }

    pub fn deselect(&mut self, classification: ResultClassification) {
        if self.selected.remove(&classification) {
            self.recompute();
        }
    }

    /// Flip one classification. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, classification: ResultClassification) -> AppResult<bool> {
        if self.is_selected(classification) {
            self.deselect(classification);
            Ok(false)
        } else {
            self.select(classification)?;
            Ok(true)
        }
    }

    /// Supported classifications of one family for one shape.
    pub fn group(&self, family: ResultFamily, shape: AnalysisShape) -> Vec<ResultClassification> {
        supported_catalog(self.backend)
            .into_iter()
            .filter(|c| c.family() == family && c.shape == shape)
            .collect()
    }

    /// Select the whole group, or deselect it when it is already fully
    /// selected. Returns whether the group is selected afterwards.
    pub fn toggle_group(&mut self, family: ResultFamily, shape: AnalysisShape) -> bool {
        let group = self.group(family, shape);
        if group.is_empty() {
            return false;
        }
        let all_selected = group.iter().all(|c| self.selected.contains(c));
        for c in group {
            if all_selected {
                self.selected.remove(&c);
            } else {
                self.selected.insert(c);
            }
        }
        self.recompute();
        !all_selected
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.recompute();
    }

    /// Selected classifications targeting `shape`.
    pub fn requested(&self, shape: AnalysisShape) -> Vec<ResultClassification> {
        self.selected
            .iter()
            .copied()
            .filter(|c| c.shape == shape)
            .collect()
    }

    /// Project file entries for the current selection.
    pub fn to_defs(&self) -> Vec<ResultSelectionDef> {
        self.selected.iter().copied().map(Into::into).collect()
    }

    fn check_supported(&self, classification: ResultClassification) -> AppResult<()> {
        if self.backend.supports(classification) {
            Ok(())
        } else {
            Err(AppError::Unsupported {
                message: format!(
                    "{classification} is not produced by the {} backend",
                    self.backend.as_str()
                ),
            })
        }
    }

    fn recompute(&mut self) {
        self.requirements = recompute(&self.selected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fe_results::ResultType;
    use proptest::prelude::*;

    fn class(t: ResultType, s: AnalysisShape) -> ResultClassification {
        ResultClassification::new(t, s)
    }

    #[test]
    fn empty_selection_needs_only_the_perfect_static() {
        let selection = Selection::new(SolverBackend::Ansys);
        assert_eq!(*selection.requirements(), AnalysisRequirements::default());
    }

    #[test]
    fn requirements_follow_every_mutation() {
        let mut selection = Selection::new(SolverBackend::Ansys);
        let soft = class(
            ResultType::EigenvalueBucklingMode1Factor,
            AnalysisShape::ImperfectSoftened,
        );

        assert!(selection.toggle(soft).unwrap());
        let req = *selection.requirements();
        assert!(req.imperfect_softened_static);
        assert!(req.imperfect_softened_eigenvalue_buckling);
        assert!(req.perfect_eigenvalue_buckling);

        assert!(!selection.toggle(soft).unwrap());
        assert_eq!(*selection.requirements(), AnalysisRequirements::default());
    }

    #[test]
    fn group_toggle_selects_then_deselects() {
        let mut selection = Selection::new(SolverBackend::Ansys);
        let fx = class(ResultType::ElementForceFx, AnalysisShape::ImperfectFullStiffness);
        selection.select(fx).unwrap();

        assert!(selection.toggle_group(
            ResultFamily::ElementNodalForce,
            AnalysisShape::ImperfectFullStiffness
        ));
        assert_eq!(selection.len(), 6);
        assert!(selection.requirements().imperfect_full_stiffness_static);

        assert!(!selection.toggle_group(
            ResultFamily::ElementNodalForce,
            AnalysisShape::ImperfectFullStiffness
        ));
        assert!(selection.is_empty());
        assert!(!selection.requirements().perfect_eigenvalue_buckling);
    }

    #[test]
    fn unsupported_results_are_rejected() {
        let mut selection = Selection::new(SolverBackend::Sap2000);
        let stress = class(ResultType::SectionNodeStressS1, AnalysisShape::Perfect);
        assert!(matches!(
            selection.select(stress),
            Err(AppError::Unsupported { .. })
        ));
        assert!(!selection.toggle_group(ResultFamily::Others, AnalysisShape::Perfect));
        assert!(selection.is_empty());
    }

    #[test]
    fn requested_is_per_shape() {
        let mut selection = Selection::new(SolverBackend::Ansys);
        selection
            .select(class(ResultType::NodalReactionFx, AnalysisShape::Perfect))
            .unwrap();
        selection
            .select(class(ResultType::StrainEnergy, AnalysisShape::ImperfectSoftened))
            .unwrap();
        assert_eq!(
            selection.requested(AnalysisShape::ImperfectSoftened),
            [class(ResultType::StrainEnergy, AnalysisShape::ImperfectSoftened)]
        );
        assert!(selection.requested(AnalysisShape::ImperfectFullStiffness).is_empty());
    }

    fn any_classification() -> impl Strategy<Value = ResultClassification> {
        let catalog = fe_results::catalog();
        (0..catalog.len()).prop_map(move |i| catalog[i])
    }

    proptest! {
        #[test]
        fn toggling_twice_restores_requirements(
            initial in proptest::collection::vec(any_classification(), 0..12),
            extra in any_classification(),
        ) {
            let mut selection = Selection::new(SolverBackend::Ansys);
            for c in initial {
                selection.select(c).unwrap();
            }
            let before = *selection.requirements();
            selection.toggle(extra).unwrap();
            selection.toggle(extra).unwrap();
            prop_assert_eq!(*selection.requirements(), before);
        }
    }
}
