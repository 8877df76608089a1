//! The `strobe run` command: seeded random stream with a scoreboard.

use std::path::{Path, PathBuf};

use strobe_config::ProjectConfig;
use strobe_sim::SimResult;

use crate::pipeline::{load_project, render_diagnostics, to_sim_config, to_stream_config};
use crate::{GlobalArgs, ReportFormat, RunArgs};

/// Runs the random stream and reports the scoreboard.
///
/// Returns exit code 0 when every word came out once and in order, 1
/// otherwise. Convergence failures propagate as errors.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let config = &project.config;

    let mut sim_config = to_sim_config(config)?;
    sim_config.trace_path = resolve_trace_path(args, config, &project.root)?;

    let mut stream = to_stream_config(config);
    if let Some(cycles) = args.cycles {
        stream.transactions = cycles;
    }
    let seed = args.seed.unwrap_or(config.stimulus.seed);

    if !global.quiet {
        eprintln!(
            "   Simulating {} ({} rounds, seed {seed})",
            config.project.name, stream.transactions
        );
    }

    let result = strobe_sim::simulate(&sim_config, &stream, seed)?;

    if args.format == ReportFormat::Json {
        println!("{}", serde_json::to_string(&result.report)?);
    }
    render_diagnostics(&result.diagnostics, args.format, global.color);

    if !global.quiet {
        print_summary(&result, &sim_config.timescale, global.verbose);
        if let Some(ref path) = sim_config.trace_path {
            eprintln!("   Trace: {}", path.display());
        }
    }

    if result.report.passed() {
        Ok(0)
    } else {
        if !global.quiet {
            eprintln!(
                "   FAILED: {} scoreboard mismatch(es)",
                result.report.mismatches().len()
            );
        }
        Ok(1)
    }
}

/// Picks the trace output path.
///
/// `--no-trace` wins, then `--trace`, then `[trace]` from the configuration
/// with `out/<project>.jsonl` as its default location.
fn resolve_trace_path(
    args: &RunArgs,
    config: &ProjectConfig,
    root: &Path,
) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    if args.no_trace {
        return Ok(None);
    }
    let path = if let Some(ref p) = args.trace {
        PathBuf::from(p)
    } else if config.trace.enabled {
        match config.trace.path {
            Some(ref p) => root.join(p),
            None => root
                .join("out")
                .join(format!("{}.jsonl", config.project.name)),
        }
    } else {
        return Ok(None);
    };
    if let Some(parent) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Some(path))
}

fn print_summary(result: &SimResult, timescale: &strobe_sim::TimeScale, verbose: bool) {
    let report = &result.report;
    eprintln!(
        "   Simulation finished at {} ({} cycles, {} sent, {} received)",
        timescale.format(result.final_time),
        report.cycles,
        report.sent.len(),
        report.received.len()
    );
    if verbose {
        let s = &result.last_stats;
        eprintln!(
            "   Last eval: {} ico, {} act, {} nba iterations, {} comb passes, {} registers changed",
            s.ico_iterations, s.act_iterations, s.nba_iterations, s.comb_passes, s.registers_changed
        );
        for line in &result.last_triggers {
            eprintln!("     {line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args() -> RunArgs {
        RunArgs {
            cycles: Some(20),
            seed: None,
            trace: None,
            no_trace: false,
            format: ReportFormat::Text,
        }
    }

    fn global_for(dir: &Path) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: Some(dir.display().to_string()),
        }
    }

    fn write_config(dir: &Path, body: &str) {
        std::fs::write(dir.join("strobe.toml"), body).unwrap();
    }

    #[test]
    fn trace_disabled_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::named("p");
        let path = resolve_trace_path(&run_args(), &config, dir.path()).unwrap();
        assert!(path.is_none());
    }

    #[test]
    fn trace_default_location_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ProjectConfig::named("p");
        config.trace.enabled = true;
        let path = resolve_trace_path(&run_args(), &config, dir.path())
            .unwrap()
            .unwrap();
        assert_eq!(path, dir.path().join("out").join("p.jsonl"));
        assert!(dir.path().join("out").is_dir());
    }

    #[test]
    fn no_trace_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ProjectConfig::named("p");
        config.trace.enabled = true;
        let mut args = run_args();
        args.no_trace = true;
        assert!(resolve_trace_path(&args, &config, dir.path())
            .unwrap()
            .is_none());
    }

    #[test]
    fn explicit_trace_used_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::named("p");
        let mut args = run_args();
        args.trace = Some("elsewhere.jsonl".into());
        let path = resolve_trace_path(&args, &config, dir.path()).unwrap();
        assert_eq!(path, Some(PathBuf::from("elsewhere.jsonl")));
    }

    #[test]
    fn explicit_trace_parent_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::named("p");
        let wanted = dir.path().join("nested").join("deeper").join("run.jsonl");
        let mut args = run_args();
        args.trace = Some(wanted.display().to_string());
        let path = resolve_trace_path(&args, &config, dir.path()).unwrap();
        assert_eq!(path, Some(wanted.clone()));
        assert!(wanted.parent().unwrap().is_dir());
    }

    #[test]
    fn run_with_explicit_trace_in_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "[project]\nname = \"t\"\n");
        let trace = dir.path().join("traces").join("t.jsonl");
        let mut args = run_args();
        args.trace = Some(trace.display().to_string());
        assert_eq!(run(&args, &global_for(dir.path())).unwrap(), 0);
        assert!(trace.is_file());
    }

    #[test]
    fn run_end_to_end_writes_trace() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            "[project]\nname = \"e2e\"\n[trace]\nenabled = true\n[stimulus]\nseed = 3\n",
        );
        let code = run(&run_args(), &global_for(dir.path())).unwrap();
        assert_eq!(code, 0);
        let trace = std::fs::read_to_string(dir.path().join("out").join("e2e.jsonl")).unwrap();
        assert!(trace.lines().next().unwrap().contains("\"header\""));
        assert!(trace.contains("\"tick\""));
    }

    #[test]
    fn run_rejects_bad_config() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "[project]\nname = \"bad\"\n[sim]\nmax_iterations = 0\n");
        assert!(run(&run_args(), &global_for(dir.path())).is_err());
    }
}
