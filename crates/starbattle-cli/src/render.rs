use crate::theme::Theme;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
};
use starbattle_core::distribution::bitstring;
use starbattle_core::{
    Candidate, CellStatus, CompiledPuzzle, Grid, Position, SolveReport, Variable,
};
use std::io::{self, Write};

const BAR_WIDTH: usize = 32;

fn heading<W: Write>(out: &mut W, theme: &Theme, title: &str) -> io::Result<()> {
    execute!(
        out,
        SetForegroundColor(theme.key),
        Print(format!("\n═══ {} ═══\n", title)),
        ResetColor
    )
}

fn field<W: Write>(out: &mut W, theme: &Theme, label: &str, value: String) -> io::Result<()> {
    execute!(
        out,
        SetForegroundColor(theme.info),
        Print(format!("{:<16}", label)),
        SetForegroundColor(theme.fg),
        Print(value),
        Print("\n"),
        ResetColor
    )
}

/// What to print in cells the grid leaves open.
#[derive(Debug, Clone, Copy)]
pub enum CellLabels<'a> {
    Open,
    /// Variable index of each open cell
    Variables(&'a [Variable]),
    /// Listed cells as stars, the rest as empty
    Resolved(&'a [Position]),
}

/// Draw the grid with region backgrounds.
pub fn render_grid<W: Write>(
    out: &mut W,
    theme: &Theme,
    grid: &Grid,
    labels: CellLabels<'_>,
) -> io::Result<()> {
    let n = grid.size();
    let border = format!("+{}\n", "---+".repeat(n));
    execute!(out, SetForegroundColor(theme.border), Print(&border))?;
    for row in 0..n {
        execute!(out, SetForegroundColor(theme.border), Print("|"))?;
        for col in 0..n {
            let pos = Position::new(row, col);
            let (symbol, fg) = match (grid.status(pos), labels) {
                (CellStatus::Star, _) => (" * ".to_string(), theme.star),
                (CellStatus::Empty, _) => (" · ".to_string(), theme.empty),
                (CellStatus::Unknown, CellLabels::Open) => (" ? ".to_string(), theme.unknown),
                (CellStatus::Unknown, CellLabels::Variables(variables)) => {
                    match variables.iter().find(|v| v.cell == pos) {
                        Some(v) => (format!("{:^3}", v.index), theme.unknown),
                        None => (" ? ".to_string(), theme.unknown),
                    }
                }
                (CellStatus::Unknown, CellLabels::Resolved(stars)) if stars.contains(&pos) => {
                    (" * ".to_string(), theme.new_star)
                }
                (CellStatus::Unknown, CellLabels::Resolved(_)) => (" · ".to_string(), theme.empty),
            };
            execute!(
                out,
                SetBackgroundColor(theme.region(grid.region(pos))),
                SetForegroundColor(fg),
                Print(symbol),
                SetBackgroundColor(Color::Reset),
                SetForegroundColor(theme.border),
                Print("|")
            )?;
        }
        execute!(out, Print("\n"))?;
    }
    execute!(out, Print(&border), ResetColor)
}

/// Open cells numbered by variable, then one line per predicate.
pub fn render_constraints<W: Write>(
    out: &mut W,
    theme: &Theme,
    compiled: &CompiledPuzzle,
) -> io::Result<()> {
    let constraints = &compiled.constraints;
    heading(out, theme, "VARIABLES")?;
    render_grid(
        out,
        theme,
        &compiled.grid,
        CellLabels::Variables(constraints.variables()),
    )?;
    heading(out, theme, "CONSTRAINTS")?;
    for (i, predicate) in constraints.predicates().iter().enumerate() {
        execute!(
            out,
            SetForegroundColor(theme.info),
            Print(format!("{:>4}  ", i)),
            SetForegroundColor(theme.fg),
            Print(predicate.to_string()),
            Print("\n"),
            ResetColor
        )?;
    }
    Ok(())
}

/// Width and gate statistics of the checker.
pub fn render_circuit<W: Write>(
    out: &mut W,
    theme: &Theme,
    compiled: &CompiledPuzzle,
) -> io::Result<()> {
    let checker = &compiled.checker;
    let layout = checker.layout();
    heading(out, theme, "CHECKER")?;
    field(out, theme, "Eliminated:", compiled.eliminated.to_string())?;
    field(out, theme, "Variables:", layout.num_variables.to_string())?;
    field(out, theme, "Predicates:", checker.num_predicates().to_string())?;
    field(
        out,
        theme,
        "Qubits:",
        format!(
            "{} (output q{}, {} ancillas)",
            layout.total(),
            layout.output,
            layout.num_ancillas()
        ),
    )?;
    field(out, theme, "Gates:", checker.circuit().len().to_string())?;
    let counts: Vec<String> = checker
        .gate_counts()
        .iter()
        .map(|(name, n)| format!("{} {}", name, n))
        .collect();
    field(out, theme, "Gate counts:", counts.join(", "))
}

fn render_outcomes<W: Write>(
    out: &mut W,
    theme: &Theme,
    outcomes: &[Candidate],
    num_variables: usize,
    solution: Option<u64>,
) -> io::Result<()> {
    for c in outcomes {
        let filled = (c.probability * BAR_WIDTH as f64).round() as usize;
        let color = if Some(c.bits) == solution {
            theme.success
        } else {
            theme.bar
        };
        execute!(
            out,
            SetForegroundColor(theme.fg),
            Print(format!(
                "  {}  {:.4}  ",
                bitstring(c.bits, num_variables),
                c.probability
            )),
            SetForegroundColor(color),
            Print("█".repeat(filled.min(BAR_WIDTH))),
            Print("\n"),
            ResetColor
        )?;
    }
    Ok(())
}

pub fn render_report<W: Write>(
    out: &mut W,
    theme: &Theme,
    report: &SolveReport,
    top: usize,
) -> io::Result<()> {
    let plan = &report.plan;
    heading(out, theme, "SEARCH")?;
    field(out, theme, "Backend:", report.backend.clone())?;
    field(out, theme, "Search space:", plan.search_space.to_string())?;
    field(out, theme, "Solutions (M):", plan.solutions.to_string())?;
    field(
        out,
        theme,
        "Iterations:",
        format!("{} ({:?} schedule)", plan.iterations, plan.schedule),
    )?;
    field(out, theme, "Total gates:", report.stats.total_gates.to_string())?;
    field(
        out,
        theme,
        "Expected:",
        format!("{:.4}", plan.expected_success_probability),
    )?;
    if let Some(shots) = report.distribution.shots() {
        field(out, theme, "Shots:", shots.to_string())?;
    }

    heading(out, theme, "OUTCOMES")?;
    render_outcomes(
        out,
        theme,
        &report.distribution.top(top),
        report.variables.len(),
        Some(report.best.bits),
    )?;

    heading(out, theme, "SOLUTION")?;
    render_grid(
        out,
        theme,
        &report.grid,
        CellLabels::Resolved(&report.new_stars),
    )?;
    let stars: Vec<String> = report.stars.iter().map(|p| p.to_string()).collect();
    field(out, theme, "Stars:", stars.join(" "))?;
    let (text, color) = if report.verified {
        ("valid placement", theme.success)
    } else {
        ("does not satisfy the puzzle", theme.error)
    };
    execute!(
        out,
        SetForegroundColor(theme.info),
        Print(format!("{:<16}", "Verified:")),
        SetForegroundColor(color),
        Print(text),
        Print("\n"),
        ResetColor
    )
}

/// Candidates of an inconclusive run.
pub fn render_candidates<W: Write>(
    out: &mut W,
    theme: &Theme,
    candidates: &[Candidate],
    num_variables: usize,
) -> io::Result<()> {
    heading(out, theme, "INCONCLUSIVE")?;
    render_outcomes(out, theme, candidates, num_variables, None)
}
