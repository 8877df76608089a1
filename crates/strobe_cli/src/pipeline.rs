//! Shared helpers for CLI commands: project resolution, configuration
//! translation and diagnostic rendering.

use std::path::{Path, PathBuf};

use strobe_config::{load_config, load_config_file, ProjectConfig, CONFIG_FILE_NAME};
use strobe_diagnostics::{Diagnostic, DiagnosticRenderer, JsonRenderer, TerminalRenderer};
use strobe_sim::{SimConfig, StreamConfig, TimeScale};

use crate::{GlobalArgs, ReportFormat};

/// Project name used when no `strobe.toml` is found.
pub const DEFAULT_PROJECT_NAME: &str = "valid_ready";

/// A loaded configuration plus the directory relative paths resolve against.
pub struct Project {
    /// The parsed configuration.
    pub config: ProjectConfig,
    /// Directory holding `strobe.toml`, or the working directory.
    pub root: PathBuf,
}

/// Walks up from `start` looking for the nearest directory containing `strobe.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE_NAME).is_file() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Loads the project configuration named by the global args.
///
/// `--config` may name a file or a directory. Without it, the nearest
/// `strobe.toml` above the working directory is used; if there is none the
/// built-in defaults apply.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_dir() {
            let config = load_config(&p)?;
            return Ok(Project { config, root: p });
        }
        let config = load_config_file(&p)?;
        let root = p
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        return Ok(Project { config, root });
    }

    let cwd = std::env::current_dir()?;
    match find_project_root(&cwd) {
        Some(root) => Ok(Project {
            config: load_config(&root)?,
            root,
        }),
        None => Ok(Project {
            config: ProjectConfig::named(DEFAULT_PROJECT_NAME),
            root: cwd,
        }),
    }
}

/// Translates the file configuration into engine settings.
///
/// The clock period is converted to precision steps and must span at least
/// two steps so both clock phases land on distinct times.
pub fn to_sim_config(config: &ProjectConfig) -> Result<SimConfig, Box<dyn std::error::Error>> {
    let clock = &config.clock;
    let timescale = TimeScale::new(clock.time_unit, clock.time_precision).ok_or_else(|| {
        format!(
            "time precision {} is coarser than time unit {}",
            clock.time_precision, clock.time_unit
        )
    })?;
    let period_fs = clock
        .frequency
        .period_fs()
        .ok_or_else(|| format!("invalid clock frequency {}", clock.frequency))?;
    let clock_period = timescale
        .steps_from_fs(period_fs)
        .filter(|&steps| steps >= 2)
        .ok_or_else(|| {
            format!(
                "clock period of {} is shorter than two {} steps",
                clock.frequency, clock.time_precision
            )
        })?;

    Ok(SimConfig {
        max_iterations: config.sim.max_iterations,
        debug_checks: config.sim.debug_checks,
        timescale,
        clock_period,
        trace_path: None,
    })
}

/// Builds the random stream parameters from the `[stimulus]` section.
pub fn to_stream_config(config: &ProjectConfig) -> StreamConfig {
    let stim = &config.stimulus;
    StreamConfig {
        transactions: stim.transactions,
        send_probability: stim.send_probability,
        accept_probability: stim.accept_probability,
        drain_cycles: stim.drain_cycles,
    }
}

/// Renders diagnostics to stderr in the requested format.
pub fn render_diagnostics(diagnostics: &[Diagnostic], format: ReportFormat, color: bool) {
    let renderer: Box<dyn DiagnosticRenderer> = match format {
        ReportFormat::Text => Box::new(TerminalRenderer::new(color)),
        ReportFormat::Json => Box::new(JsonRenderer),
    };
    for diag in diagnostics {
        eprint!("{}", renderer.render(diag));
    }
}
