use std::fmt::Display;
use std::fmt::Formatter;

use crate::sim::StepOutcome;

/// Renders a run's collected outcomes as the classic animation table:
/// one column per processed reference, one row per memory frame, plus
/// a fault/hit marker row. Any outcome consumer can format a trace,
/// the simulator itself never touches a display.
pub struct TraceDisplay<'a> {
    frame_count: usize,
    trace: &'a [StepOutcome],
}

impl<'a> TraceDisplay<'a> {
    pub fn new(frame_count: usize, trace: &'a [StepOutcome]) -> Self {
        Self { frame_count, trace }
    }
}

impl Display for TraceDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.trace.is_empty() {
            return writeln!(f, "Empty trace");
        }

        // rows[0] is the reference header, then one row per frame,
        // then the fault/hit marker row; column 0 holds the labels.
        let mut rows: Vec<Vec<String>> = Vec::with_capacity(self.frame_count + 2);
        rows.push(vec!["Pages".to_string()]);
        for i in 0..self.frame_count {
            rows.push(vec![format!("Memory {}", i + 1)]);
        }
        rows.push(vec!["Result".to_string()]);

        for outcome in self.trace {
            rows[0].push(outcome.page.to_string());
            for i in 0..self.frame_count {
                let cell = match outcome.frames.get(i).copied().flatten() {
                    Some(page) => page.to_string(),
                    None => "-".to_string(),
                };
                rows[i + 1].push(cell);
            }
            let marker = if outcome.fault { "F" } else { "H" };
            rows[self.frame_count + 1].push(marker.to_string());
        }

        let mut widths = vec![0; rows[0].len()];
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }

        let print_border = |f: &mut Formatter<'_>| -> std::fmt::Result {
            write!(f, "+")?;
            for width in &widths {
                write!(f, "{:-<width$}+", "", width = width + 2)?;
            }
            writeln!(f)
        };
        let print_row = |f: &mut Formatter<'_>, row: &[String]| -> std::fmt::Result {
            write!(f, "|")?;
            for (i, cell) in row.iter().enumerate() {
                write!(f, " {:width$} |", cell, width = widths[i])?;
            }
            writeln!(f)
        };

        print_border(f)?;
        print_row(f, &rows[0])?;
        print_border(f)?;
        for row in &rows[1..=self.frame_count] {
            print_row(f, row)?;
        }
        print_border(f)?;
        print_row(f, &rows[self.frame_count + 1])?;
        print_border(f)
    }
}
