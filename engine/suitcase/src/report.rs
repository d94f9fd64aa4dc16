//! Run-summary table.
//!
//! Renders the counts of the most recent run as a fixed-width table with
//! one row per entity (suites, tests, asserts) and the columns Total, Ran,
//! Passed, Failed, Inactive. Cells that have no meaning for a row read
//! `n/a`.

use std::fmt::Write as _;

use crate::summary::RunSummary;

const TITLE: &str = "\nRun Summary:";
const NOT_APPLICABLE: &str = "n/a";
const MIN_WIDTH: usize = 6;

/// Width of a column: the widest cell (header included), at least
/// [`MIN_WIDTH`], plus one separating space.
fn column_width(cells: &[&str]) -> usize {
    cells
        .iter()
        .map(|cell| cell.len())
        .fold(MIN_WIDTH, usize::max)
        + 1
}

/// Render the run-summary table.
///
/// `suites_total` and `tests_total` are the registry's counts; every other
/// cell comes from `summary`.
pub fn run_results_table(summary: &RunSummary, suites_total: u32, tests_total: u32) -> String {
    let na = NOT_APPLICABLE.to_owned();
    let rows: [[String; 6]; 3] = [
        [
            "suites".to_owned(),
            suites_total.to_string(),
            summary.suites_run.to_string(),
            na.clone(),
            summary.suites_failed.to_string(),
            summary.suites_inactive.to_string(),
        ],
        [
            "tests".to_owned(),
            tests_total.to_string(),
            summary.tests_run.to_string(),
            summary.tests_passed().to_string(),
            summary.tests_failed.to_string(),
            summary.tests_inactive.to_string(),
        ],
        [
            "asserts".to_owned(),
            summary.asserts.to_string(),
            summary.asserts.to_string(),
            summary.asserts_passed().to_string(),
            summary.asserts_failed.to_string(),
            na,
        ],
    ];
    let headers = ["Type", "Total", "Ran", "Passed", "Failed", "Inactive"];

    let mut widths = [0usize; 6];
    for (col, width) in widths.iter_mut().enumerate() {
        let mut cells = vec![headers[col]];
        cells.extend(rows.iter().map(|row| row[col].as_str()));
        *width = column_width(&cells);
    }
    let lead = TITLE.len();

    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write!(out, "{TITLE:>lead$}");
    for (header, width) in headers.iter().zip(widths) {
        let _ = write!(out, "{header:>width$}");
    }
    out.push('\n');
    for row in &rows {
        let _ = write!(out, "{:>lead$}", " ");
        for (cell, width) in row.iter().zip(widths) {
            let _ = write!(out, "{cell:>width$}");
        }
        out.push('\n');
    }
    out.push('\n');
    out
}
