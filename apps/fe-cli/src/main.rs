use clap::{Parser, Subcommand};
use fe_app::{
    AppError, AppResult, IterationProtocol, RunOptions, RunProgressEvent, RunRequest, RunStage,
    Selection, project_service, query, run_service,
};
use fe_core::PollPolicy;
use fe_engine::SkeletonTemplater;
use fe_project::Project;
use fe_results::{AnalysisShape, MessageLevel, ResultClassification, ResultFamily, ResultType};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fe-cli")]
#[command(about = "femflow CLI - drive an FE engine through its work directory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate project file syntax and structure
    Validate {
        /// Path to the project YAML file
        project_path: PathBuf,
    },
    /// List the results the project's backend can produce
    Catalog {
        /// Path to the project YAML file
        project_path: PathBuf,
    },
    /// Show which analyses the selection requires
    Requirements {
        /// Path to the project YAML file
        project_path: PathBuf,
        /// Toggle a result, as RESULT@SHAPE (repeatable)
        #[arg(long = "toggle", value_parser = parse_classification)]
        toggles: Vec<ResultClassification>,
        /// Toggle a whole family for a shape, as FAMILY@SHAPE (repeatable)
        #[arg(long = "toggle-group", value_parser = parse_group)]
        groups: Vec<(ResultFamily, AnalysisShape)>,
        /// Write the resulting selection back to the project file
        #[arg(long)]
        save: bool,
    },
    /// Run one analysis iteration
    Run {
        /// Path to the project YAML file
        project_path: PathBuf,
        /// Results to request instead of the project's list, as RESULT@SHAPE
        #[arg(long = "select", value_parser = parse_classification)]
        select: Vec<ResultClassification>,
        /// Do not archive the run next to the project
        #[arg(long)]
        no_save: bool,
    },
    /// List archived runs of a project
    Runs {
        /// Path to the project YAML file
        project_path: PathBuf,
    },
    /// Show details of an archived run
    ShowRun {
        /// Path to the project YAML file
        project_path: PathBuf,
        /// Run ID to display
        run_id: String,
        /// Print the manifest and summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// List running engine instances
    Instances {
        /// Path to the project YAML file
        project_path: PathBuf,
    },
    /// Kill every running engine instance
    KillEngines {
        /// Path to the project YAML file
        project_path: PathBuf,
    },
    /// Ask the project's engine to exit
    Shutdown {
        /// Path to the project YAML file
        project_path: PathBuf,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Catalog { project_path } => cmd_catalog(&project_path),
        Commands::Requirements {
            project_path,
            toggles,
            groups,
            save,
        } => cmd_requirements(&project_path, &toggles, &groups, save),
        Commands::Run {
            project_path,
            select,
            no_save,
        } => cmd_run(&project_path, &select, !no_save),
        Commands::Runs { project_path } => cmd_runs(&project_path),
        Commands::ShowRun {
            project_path,
            run_id,
            json,
        } => cmd_show_run(&project_path, &run_id, json),
        Commands::Instances { project_path } => cmd_instances(&project_path),
        Commands::KillEngines { project_path } => cmd_kill_engines(&project_path),
        Commands::Shutdown { project_path } => cmd_shutdown(&project_path),
    }
}

fn parse_classification(raw: &str) -> Result<ResultClassification, String> {
    let (result, shape) = raw
        .split_once('@')
        .ok_or_else(|| format!("expected RESULT@SHAPE, got '{raw}'"))?;
    let result: ResultType = result.trim().parse().map_err(|e| format!("{e}"))?;
    let shape: AnalysisShape = shape.trim().parse().map_err(|e| format!("{e}"))?;
    Ok(ResultClassification::new(result, shape))
}

fn parse_group(raw: &str) -> Result<(ResultFamily, AnalysisShape), String> {
    let (family, shape) = raw
        .split_once('@')
        .ok_or_else(|| format!("expected FAMILY@SHAPE, got '{raw}'"))?;
    let family: ResultFamily = family.trim().parse().map_err(|e| format!("{e}"))?;
    let shape: AnalysisShape = shape.trim().parse().map_err(|e| format!("{e}"))?;
    Ok((family, shape))
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = project_service::load_project(project_path)?;
    project_service::validate_project(&project)?;
    println!("✓ Project is valid");
    Ok(())
}

fn cmd_catalog(project_path: &Path) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let entries = project_service::catalog_entries(project.engine.backend);

    println!(
        "Results produced by the {} backend ({}):",
        project.engine.backend.as_str(),
        entries.len()
    );
    for entry in entries {
        let marker = if entry.default_selected { "*" } else { " " };
        println!(
            " {} {:<48} {}",
            marker,
            entry.classification.to_string(),
            entry.output_stem
        );
    }
    Ok(())
}

fn cmd_requirements(
    project_path: &Path,
    toggles: &[ResultClassification],
    groups: &[(ResultFamily, AnalysisShape)],
    save: bool,
) -> AppResult<()> {
    let mut project = project_service::load_project(project_path)?;
    let mut selection = Selection::from_project(&project)?;

    for &classification in toggles {
        let selected = selection.toggle(classification)?;
        println!(
            "  {} {}",
            if selected { "+" } else { "-" },
            classification
        );
    }
    for &(family, shape) in groups {
        let selected = selection.toggle_group(family, shape);
        println!(
            "  {} {} @ {}",
            if selected { "+" } else { "-" },
            family,
            shape
        );
    }

    println!("Selected results: {}", selection.len());
    print_stages(&selection);

    if save {
        project_service::apply_selection(&mut project, &selection)?;
        project_service::save_project(project_path, &project)?;
        println!("✓ Selection saved to {}", project_path.display());
    }
    Ok(())
}

fn print_stages(selection: &Selection) {
    println!("\nAnalyses required:");
    for stage in project_service::analysis_stages(selection) {
        let mut analyses = Vec::new();
        if stage.static_analysis {
            analyses.push("static");
        }
        if stage.eigenvalue_buckling {
            analyses.push("eigenvalue buckling");
        }
        let analyses = if analyses.is_empty() {
            "-".to_string()
        } else {
            analyses.join(" + ")
        };
        println!(
            "  {:<30} {:<30} ({} requested)",
            stage.shape.as_str(),
            analyses,
            stage.requested
        );
    }
}

fn protocol_for(project: &Project) -> IterationProtocol {
    IterationProtocol::new(Box::new(SkeletonTemplater::new(project.engine.job_name.clone())))
        .with_poll_policy(PollPolicy::with_optional_timeout(
            project.engine.poll_interval(),
            project.engine.completion_timeout(),
        ))
}

fn cmd_run(project_path: &Path, select: &[ResultClassification], save: bool) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let selection = if select.is_empty() {
        Selection::from_project(&project)?
    } else {
        let mut selection = Selection::new(project.engine.backend);
        for &classification in select {
            selection.select(classification)?;
        }
        selection
    };

    println!(
        "Running iteration for project '{}' ({} results selected)",
        project.name,
        selection.len()
    );

    let protocol = protocol_for(&project);
    let mut backend = run_service::open_backend(&project)?;
    let request = RunRequest {
        project_path,
        project: &project,
        selection: &selection,
        options: RunOptions { save },
    };

    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let result = run_service::run_iteration_with_progress(
        &protocol,
        backend.as_mut(),
        &request,
        Some(&mut |event: RunProgressEvent| {
            let emit_now =
                last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    );
    clear_progress_line();

    let response = match result {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = %err, "iteration failed");
            if err.is_not_converged() {
                eprintln!("✗ The solution did not converge; no results were kept");
            }
            return Err(err);
        }
    };

    println!("✓ Iteration completed: {}", response.run_id);
    if response.saved {
        println!("  Archived next to {}", project_path.display());
    }
    print_timing_summary(&response.timing);

    println!("\nResults:");
    println!("  Items: {}", response.store.len());
    println!("  Screenshots: {}", response.store.screenshots().len());
    println!("  Mesh nodes: {}", response.store.mesh.node_count());
    print_messages(&response.messages);

    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    let spinner = ['|', '/', '-', '\\'];
    let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
    let mut line = format!(
        "\r{} {}  elapsed={:.2}s",
        spinner[spin_idx],
        event.stage.as_str(),
        event.elapsed_wall_s
    );
    if let Some(script) = &event.script {
        line.push_str(&format!(
            "  artifacts={}  script={}B",
            script.expected_artifacts, script.script_bytes
        ));
    }
    if let Some(msg) = &event.message {
        line.push_str(&format!("  {}", msg));
    }
    print!("{}", line);
    let _ = io::stdout().flush();
    if event.stage == RunStage::Completed {
        println!();
    }
}

fn print_timing_summary(timing: &fe_app::RunTimingSummary) {
    let total = timing.total_s.max(1.0e-12);
    let pct = |s: f64| 100.0 * s / total;

    println!("\nTiming summary:");
    println!(
        "  Engine:  {:.3}s ({:.1}%)",
        timing.engine_start_s,
        pct(timing.engine_start_s)
    );
    println!("  Reset:   {:.3}s ({:.1}%)", timing.reset_s, pct(timing.reset_s));
    println!(
        "  Script:  {:.3}s ({:.1}%)",
        timing.build_s + timing.write_s,
        pct(timing.build_s + timing.write_s)
    );
    println!("  Solve:   {:.3}s ({:.1}%)", timing.solve_s, pct(timing.solve_s));
    println!("  Ingest:  {:.3}s ({:.1}%)", timing.ingest_s, pct(timing.ingest_s));
    if timing.save_s > 0.0 {
        println!("  Save:    {:.3}s ({:.1}%)", timing.save_s, pct(timing.save_s));
    }
    println!("  Total:   {:.3}s", timing.total_s);
}

fn print_messages(messages: &[fe_results::EngineMessage]) {
    if messages.is_empty() {
        return;
    }
    println!("\nEngine messages:");
    for message in messages {
        let level = match message.level {
            MessageLevel::Warning => "WARNING",
            MessageLevel::Error => "ERROR",
        };
        println!("  {}: {}", level, message.text);
    }
}

fn cmd_runs(project_path: &Path) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let runs = run_service::list_runs(project_path, &project.name)?;

    if runs.is_empty() {
        println!("No archived runs for project: {}", project.name);
    } else {
        println!("Archived runs for project '{}':", project.name);
        for manifest in runs {
            println!(
                "  {} ({}, {} items, {} warnings)",
                manifest.run_id,
                manifest.timestamp,
                manifest.item_count,
                manifest.messages.len()
            );
        }
    }
    Ok(())
}

fn cmd_show_run(project_path: &Path, run_id: &str, json: bool) -> AppResult<()> {
    let (manifest, store) = run_service::load_run(project_path, run_id)?;

    let summary = query::get_run_summary(&manifest, &store);

    if json {
        let report = serde_json::json!({ "manifest": manifest, "summary": summary });
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| AppError::Results(e.to_string()))?;
        println!("{}", text);
        return Ok(());
    }

    println!("Loading run: {}", run_id);

    println!("\nRun Summary:");
    println!("  Backend: {}", manifest.backend.as_str());
    println!("  Timestamp: {}", manifest.timestamp);
    println!("  Items: {}", summary.item_count);
    println!("  Screenshots: {}", summary.screenshot_count);
    println!("  Nodes: {}", summary.node_count);
    println!("  Elements: {}", summary.element_count);
    println!("  Section nodes: {}", summary.section_node_count);

    println!("\nSelection:");
    for classification in &manifest.selection {
        println!("  {}", classification);
    }

    for shape in AnalysisShape::ALL {
        if let Some(buckling) = query::buckling_summary(&store, shape) {
            println!("\nEigenvalue buckling ({}):", shape);
            for (mode, multiplier) in buckling.non_negative_multipliers() {
                println!("  mode {}: {:.6}", mode, multiplier);
            }
        }
        if let Ok((location, value)) =
            query::extreme_value(&store, ResultType::NodalDisplacementUTotal, shape)
        {
            println!("\nMax displacement ({}): {:.6} at {:?}", shape, value, location);
        }
    }

    print_messages(&manifest.messages);
    Ok(())
}

fn cmd_instances(project_path: &Path) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let mut backend = run_service::open_backend(&project)?;
    let instances = backend.list_running_instances()?;

    if instances.is_empty() {
        println!("No engine instances running");
    } else {
        println!("Running engine instances:");
        for process in instances {
            match process.parent_pid {
                Some(parent) => println!("  {} {} (parent {})", process.pid, process.name, parent),
                None => println!("  {} {}", process.pid, process.name),
            }
        }
    }
    Ok(())
}

fn cmd_kill_engines(project_path: &Path) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let mut backend = run_service::open_backend(&project)?;
    let killed = backend.kill_all()?;
    println!("✓ Killed {} engine instance(s)", killed);
    Ok(())
}

fn cmd_shutdown(project_path: &Path) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let mut backend = run_service::open_backend(&project)?;
    backend.shutdown()?;
    println!("✓ Engine shut down");
    Ok(())
}
