//! The `strobe inspect` command: the published signal table.

use serde::Serialize;
use strobe_common::ArenaId;
use strobe_sim::{Direction, SignalKind, Simulator, ValidReadyStage};

use crate::pipeline::{load_project, to_sim_config};
use crate::{GlobalArgs, InspectArgs, ReportFormat};

/// One row of the signal table.
#[derive(Debug, Serialize)]
pub struct SignalRow {
    /// Flat signal index, as used in trace files.
    pub index: u32,
    /// Hierarchical name.
    pub name: String,
    /// Declared width in bits.
    pub width: u32,
    /// Port direction.
    pub direction: Direction,
    /// Wire or register.
    pub kind: SignalKind,
}

/// Elaborates the stage and prints its signals.
pub fn run(args: &InspectArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let sim_config = to_sim_config(&project.config)?;
    let sim = Simulator::<ValidReadyStage>::new(&sim_config)?;
    let rows = signal_rows(&sim);

    match args.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        ReportFormat::Text => print!("{}", format_table(&rows)),
    }
    Ok(0)
}

/// Lists every signal of a simulator in declaration order.
pub fn signal_rows(sim: &Simulator<ValidReadyStage>) -> Vec<SignalRow> {
    sim.signals()
        .map(|(id, state)| SignalRow {
            index: id.as_raw(),
            name: sim.signal_path(id).to_string(),
            width: state.width(),
            direction: state.direction,
            kind: state.kind,
        })
        .collect()
}

fn format_table(rows: &[SignalRow]) -> String {
    let name_width = rows.iter().map(|r| r.name.len()).max().unwrap_or(4).max(4);
    let mut out = format!(
        "{:>5}  {:<name_width$}  {:>5}  {:<9}  kind\n",
        "index", "name", "width", "direction"
    );
    for row in rows {
        let direction = match row.direction {
            Direction::Input => "input",
            Direction::Output => "output",
            Direction::Internal => "internal",
        };
        let kind = match row.kind {
            SignalKind::Wire => "wire",
            SignalKind::Register => "register",
        };
        out.push_str(&format!(
            "{:>5}  {:<name_width$}  {:>5}  {:<9}  {kind}\n",
            row.index, row.name, row.width, direction
        ));
    }
    out
}
