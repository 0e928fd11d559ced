//! Iteration script assembly.
//!
//! [`ScriptBuilder`] decides which analysis stages and listings a script
//! contains and records every artifact they make the engine write. The
//! statements themselves come from a [`ScriptTemplater`].

use crate::error::EngineResult;
use fe_ingest::{
    ArtifactKind, ExpectedOutputSet, MESH_ELEMENTS_ARTIFACT, MESH_NODES_ARTIFACT, ResultArtifact,
    StrategyRegistry, representative,
};
use fe_project::AnalysisOptions;
use fe_results::{
    AnalysisRequirements, AnalysisShape, ResultClassification, ResultFamily, ViewDirection,
};
use std::collections::HashSet;
use std::fmt::{self, Write};

/// Emits the engine statements of each script section.
pub trait ScriptTemplater {
    fn header(&self, out: &mut String, title: &str) -> fmt::Result;

    /// Model definition and the perfect-shape static solve.
    fn perfect_static(&self, out: &mut String, options: &AnalysisOptions) -> fmt::Result;

    /// Writes [`MESH_NODES_ARTIFACT`] and [`MESH_ELEMENTS_ARTIFACT`].
    fn mesh_listings(&self, out: &mut String) -> fmt::Result;

    fn eigenvalue_buckling(&self, out: &mut String, options: &AnalysisOptions) -> fmt::Result;

    /// Displace the geometry along the selected buckling mode.
    fn update_imperfect_geometry(&self, out: &mut String, options: &AnalysisOptions)
    -> fmt::Result;

    fn soften(&self, out: &mut String, options: &AnalysisOptions) -> fmt::Result;

    fn imperfect_static(&self, out: &mut String, options: &AnalysisOptions) -> fmt::Result;

    /// One listing block writing every file in `artifacts`.
    fn result_listing(
        &self,
        out: &mut String,
        classification: ResultClassification,
        artifacts: &[(String, ResultArtifact)],
    ) -> fmt::Result;

    fn screenshot(
        &self,
        out: &mut String,
        classification: ResultClassification,
        direction: ViewDirection,
        file_name: &str,
    ) -> fmt::Result;
}

/// Script text plus the artifacts it will produce.
#[derive(Debug, Clone)]
pub struct BuiltScript {
    pub text: String,
    pub expected: ExpectedOutputSet,
}

pub struct ScriptBuilder<'a> {
    registry: &'a StrategyRegistry,
    templater: &'a dyn ScriptTemplater,
    options: &'a AnalysisOptions,
    directions: &'a [ViewDirection],
}

struct Draft {
    text: String,
    expected: ExpectedOutputSet,
}

impl<'a> ScriptBuilder<'a> {
    pub fn new(
        registry: &'a StrategyRegistry,
        templater: &'a dyn ScriptTemplater,
        options: &'a AnalysisOptions,
    ) -> Self {
        Self {
            registry,
            templater,
            options,
            directions: &[],
        }
    }

    /// Capture every selected result from these directions.
    pub fn with_screenshots(mut self, directions: &'a [ViewDirection]) -> Self {
        self.directions = directions;
        self
    }

    pub fn build(
        &self,
        selection: &[ResultClassification],
        requirements: &AnalysisRequirements,
    ) -> EngineResult<BuiltScript> {
        let t = self.templater;
        let mut draft = Draft {
            text: String::new(),
            expected: ExpectedOutputSet::new(),
        };

        let mut selected = Vec::new();
        for c in selection {
            if !selected.contains(c) {
                selected.push(*c);
            }
        }

        t.header(&mut draft.text, "Perfect shape - static analysis")?;
        t.perfect_static(&mut draft.text, self.options)?;
        t.header(&mut draft.text, "Perfect shape - mesh listings")?;
        t.mesh_listings(&mut draft.text)?;
        draft
            .expected
            .insert(MESH_NODES_ARTIFACT, ArtifactKind::MeshNodes);
        draft
            .expected
            .insert(MESH_ELEMENTS_ARTIFACT, ArtifactKind::MeshElements);
        self.results(&mut draft, &selected, AnalysisShape::Perfect, false)?;

        if !(requirements.perfect_eigenvalue_buckling || requirements.any_imperfect()) {
            return Ok(draft.finish());
        }

        t.header(&mut draft.text, "Perfect shape - eigenvalue buckling")?;
        t.eigenvalue_buckling(&mut draft.text, self.options)?;
        self.results(&mut draft, &selected, AnalysisShape::Perfect, true)?;

        if !requirements.any_imperfect() {
            return Ok(draft.finish());
        }

        t.header(&mut draft.text, "Imperfect shape - geometry update")?;
        t.update_imperfect_geometry(&mut draft.text, self.options)?;

        for shape in [
            AnalysisShape::ImperfectFullStiffness,
            AnalysisShape::ImperfectSoftened,
        ] {
            if requirements.static_required(shape) {
                t.header(&mut draft.text, &format!("{} - static analysis", shape_title(shape)))?;
                if shape == AnalysisShape::ImperfectSoftened {
                    t.soften(&mut draft.text, self.options)?;
                }
                t.imperfect_static(&mut draft.text, self.options)?;
                self.results(&mut draft, &selected, shape, false)?;
            }
            if requirements.eigenvalue_buckling_required(shape) {
                t.header(
                    &mut draft.text,
                    &format!("{} - eigenvalue buckling", shape_title(shape)),
                )?;
                t.eigenvalue_buckling(&mut draft.text, self.options)?;
                self.results(&mut draft, &selected, shape, true)?;
            }
        }

        Ok(draft.finish())
    }

    /// Listings then screenshots of one analysis stage.
    fn results(
        &self,
        draft: &mut Draft,
        selected: &[ResultClassification],
        shape: AnalysisShape,
        eigenvalue_buckling: bool,
    ) -> EngineResult<()> {
        let targets: Vec<ResultClassification> = selected
            .iter()
            .copied()
            .filter(|c| c.shape == shape && c.is_eigenvalue_buckling() == eigenvalue_buckling)
            .collect();
        if targets.is_empty() {
            return Ok(());
        }

        let t = self.templater;
        t.header(&mut draft.text, &format!("{} - results", shape_title(shape)))?;
        let mut written = HashSet::new();
        for c in &targets {
            let rep = representative(*c);
            if !written.insert(rep) {
                continue;
            }
            let artifacts = self.registry.artifacts(*c)?;
            t.result_listing(&mut draft.text, rep, &artifacts)?;
            for (name, artifact) in artifacts {
                draft.expected.insert(name, ArtifactKind::Result(artifact));
            }
        }

        if self.directions.is_empty() {
            return Ok(());
        }
        t.header(&mut draft.text, &format!("{} - screenshots", shape_title(shape)))?;
        for c in &targets {
            for direction in self.directions {
                let name = format!("{}_{}.png", c.screenshot_stem(), direction.as_str());
                t.screenshot(&mut draft.text, *c, *direction, &name)?;
                draft.expected.insert(name, ArtifactKind::Screenshot(*c));
            }
        }
        Ok(())
    }
}

impl Draft {
    fn finish(self) -> BuiltScript {
        tracing::debug!(
            bytes = self.text.len(),
            artifacts = self.expected.len(),
            "iteration script built"
        );
        BuiltScript {
            text: self.text,
            expected: self.expected,
        }
    }
}

fn shape_title(shape: AnalysisShape) -> &'static str {
    match shape {
        AnalysisShape::Perfect => "Perfect shape",
        AnalysisShape::ImperfectFullStiffness => "Imperfect shape, full stiffness",
        AnalysisShape::ImperfectSoftened => "Imperfect shape, softened",
    }
}

/// Section frame with the file redirections the ingestion side relies on.
///
/// Model geometry, loads and material data are not generated here; the
/// model-definition blocks only mark where they go.
#[derive(Debug, Clone)]
pub struct SkeletonTemplater {
    job_name: String,
}

impl Default for SkeletonTemplater {
    fn default() -> Self {
        Self::new("fe_job")
    }
}

impl SkeletonTemplater {
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
        }
    }
}

const TEMP_LISTING: &str = "result_temp";

fn listing_command(classification: ResultClassification) -> &'static str {
    match classification.family() {
        ResultFamily::NodalReaction => "PRRSOL",
        ResultFamily::NodalDisplacement => "PRNSOL,U,COMP",
        ResultFamily::SectionNodeStress => "PRESOL,S,PRIN",
        ResultFamily::SectionNodeStrain => "PRESOL,EPTT,PRIN",
        ResultFamily::ElementNodalBendingStrain => "PRESOL,SMISC",
        ResultFamily::ElementNodalForce => "PRESOL,SMISC",
        ResultFamily::ElementNodalStrain => "PRESOL,SMISC",
        ResultFamily::ElementNodalStress => "PRESOL,SMISC",
        ResultFamily::Others if classification.is_eigenvalue_buckling() => "SET,LIST",
        ResultFamily::Others => "PRETAB",
    }
}

impl ScriptTemplater for SkeletonTemplater {
    fn header(&self, out: &mut String, title: &str) -> fmt::Result {
        let rule = "!".repeat(72);
        writeln!(out, "{rule}")?;
        writeln!(out, "! {title}")?;
        writeln!(out, "{rule}")
    }

    fn perfect_static(&self, out: &mut String, options: &AnalysisOptions) -> fmt::Result {
        writeln!(out, "/PREP7")?;
        writeln!(out, "ET,1,BEAM189")?;
        writeln!(out, "! model definition: {} elements per frame", options.elements_per_frame)?;
        writeln!(out, "FINISH")?;
        writeln!(out, "/SOLU")?;
        writeln!(out, "ANTYPE,STATIC")?;
        let nlgeom = if options.large_deflections { "ON" } else { "OFF" };
        writeln!(out, "NLGEOM,{nlgeom}")?;
        writeln!(out, "PSTRES,ON")?;
        writeln!(out, "SOLVE")?;
        writeln!(out, "FINISH")
    }

    fn mesh_listings(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "/POST1")?;
        writeln!(out, "SET,LAST")?;
        writeln!(out, "ALLSEL,ALL")?;
        writeln!(out, "/HEADER,OFF,OFF,OFF,OFF,ON,OFF")?;
        writeln!(out, "/PAGE,,,-100000000,240,0")?;
        writeln!(out, "/FORMAT,10,G,20,6,,,")?;
        let nodes = MESH_NODES_ARTIFACT.trim_end_matches(".txt");
        writeln!(out, "/OUTPUT,'{nodes}','txt'")?;
        writeln!(out, "NLIST")?;
        writeln!(out, "/OUTPUT")?;
        let elements = MESH_ELEMENTS_ARTIFACT.trim_end_matches(".txt");
        writeln!(out, "*CFOPEN,'{elements}','txt'")?;
        writeln!(out, "*VWRITE,'LINE',',','ELEM',',','INODE',',','JNODE',',','KNODE'")?;
        writeln!(out, "(A4,A1,A4,A1,A5,A1,A5,A1,A5)")?;
        writeln!(out, "! one row per beam element of every line")?;
        writeln!(out, "*CFCLOSE")
    }

    fn eigenvalue_buckling(&self, out: &mut String, options: &AnalysisOptions) -> fmt::Result {
        writeln!(out, "/SOLU")?;
        writeln!(out, "ANTYPE,BUCKLE")?;
        writeln!(out, "BUCOPT,LANB,{}", options.eigenvalue_buckling_modes)?;
        writeln!(out, "MXPAND,{},,,YES", options.eigenvalue_buckling_modes)?;
        writeln!(out, "SOLVE")?;
        writeln!(out, "FINISH")
    }

    fn update_imperfect_geometry(
        &self,
        out: &mut String,
        options: &AnalysisOptions,
    ) -> fmt::Result {
        writeln!(out, "/PREP7")?;
        writeln!(
            out,
            "UPGEOM,{},1,{},'{}','rst'",
            options.imperfect_multiplier, options.imperfect_mode, self.job_name
        )?;
        writeln!(out, "FINISH")
    }

    fn soften(&self, out: &mut String, _options: &AnalysisOptions) -> fmt::Result {
        writeln!(out, "/PREP7")?;
        writeln!(out, "! softened material moduli")?;
        writeln!(out, "FINISH")
    }

    fn imperfect_static(&self, out: &mut String, options: &AnalysisOptions) -> fmt::Result {
        writeln!(out, "/SOLU")?;
        writeln!(out, "ANTYPE,STATIC")?;
        let nlgeom = if options.large_deflections { "ON" } else { "OFF" };
        writeln!(out, "NLGEOM,{nlgeom}")?;
        writeln!(out, "PSTRES,ON")?;
        writeln!(out, "SOLVE")?;
        writeln!(out, "FINISH")
    }

    fn result_listing(
        &self,
        out: &mut String,
        classification: ResultClassification,
        artifacts: &[(String, ResultArtifact)],
    ) -> fmt::Result {
        writeln!(out, "/POST1")?;
        writeln!(out, "SET,LAST")?;
        for (name, artifact) in artifacts {
            let stem = name.trim_end_matches(".txt");
            writeln!(out, "ALLSEL,ALL")?;
            if let Some(end) = artifact.end {
                writeln!(out, "! element end {end:?}")?;
            }
            writeln!(out, "/OUTPUT,'{TEMP_LISTING}','txt'")?;
            writeln!(out, "{}", listing_command(classification))?;
            writeln!(out, "/OUTPUT")?;
            writeln!(out, "/RENAME,{TEMP_LISTING},txt,,{stem},txt")?;
        }
        Ok(())
    }

    fn screenshot(
        &self,
        out: &mut String,
        classification: ResultClassification,
        direction: ViewDirection,
        file_name: &str,
    ) -> fmt::Result {
        let stem = file_name.trim_end_matches(".png");
        writeln!(out, "/SHOW,PNG")?;
        writeln!(out, "! view {}", direction.as_str())?;
        writeln!(out, "! plot {}", classification.result_type.as_str())?;
        writeln!(out, "/SHOW,CLOSE")?;
        writeln!(out, "/RENAME,{}000,png,,{stem},png", self.job_name)
    }
}
