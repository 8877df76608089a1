//! The `strobe check` command: directed handshake scenarios.

use strobe_diagnostics::{Diagnostic, DiagnosticCode, Location};
use strobe_sim::{Scenario, SCENARIOS};

use crate::pipeline::{load_project, render_diagnostics, to_sim_config};
use crate::{CheckArgs, GlobalArgs};

/// Runs every scenario whose name contains the filter.
///
/// Returns exit code 0 if all selected scenarios pass, 1 otherwise.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let sim_config = to_sim_config(&project.config)?;

    let selected = select(args.filter.as_deref());
    if selected.is_empty() {
        return Err(format!(
            "no scenario matches '{}'",
            args.filter.as_deref().unwrap_or_default()
        )
        .into());
    }

    let mut diagnostics = Vec::new();
    let mut failed = 0;
    for scenario in &selected {
        let outcome = scenario.run(&sim_config)?;
        if outcome.passed() {
            if !global.quiet {
                eprintln!("   ok   {}", scenario.name);
            }
            continue;
        }
        failed += 1;
        if !global.quiet {
            eprintln!("   FAIL {}", scenario.name);
        }
        let mut diag = Diagnostic::error(
            DiagnosticCode::CHECK_FAILED,
            format!("scenario '{}' failed: {}", scenario.name, scenario.description),
            Location::NONE,
        );
        for failure in outcome.failures {
            diag = diag.with_note(failure);
        }
        diagnostics.push(diag);
    }

    render_diagnostics(&diagnostics, args.format, global.color);
    if !global.quiet {
        eprintln!(
            "   {} passed, {failed} failed",
            selected.len() - failed
        );
    }
    Ok(if failed == 0 { 0 } else { 1 })
}

fn select(filter: Option<&str>) -> Vec<&'static Scenario> {
    SCENARIOS
        .iter()
        .filter(|s| filter.map_or(true, |f| s.name.contains(f)))
        .collect()
}
