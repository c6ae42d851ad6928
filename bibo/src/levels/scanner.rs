use common::Buffer2;

use super::{ColumnOrder, LevelConfig, RefinePolicy, RefinementConfig, ScoreMode};

pub(crate) struct ScanInput<'a> {
    pub pass1: &'a Buffer2<f32>,
    pub pass2: Option<(&'a Buffer2<f32>, &'a RefinementConfig)>,
    pub config: &'a LevelConfig,
    /// Inclusive search rows.
    pub rows: (usize, usize),
    /// Inclusive columns.
    pub columns: (usize, usize),
    /// Top of the column processed just before the first one.
    pub seed: Option<usize>,
}

/// Per-column rows, indexed from `columns.0`.
pub(crate) struct ScannedLevels {
    pub top: Vec<usize>,
    pub bottom: Vec<usize>,
}

pub(crate) fn scan_columns(input: &ScanInput) -> ScannedLevels {
    let (first, last) = input.columns;
    let (y0, y1) = input.rows;
    let count = last - first + 1;
    let mut top = vec![y0; count];
    let mut bottom = vec![y1; count];

    let order: Box<dyn Iterator<Item = usize>> = match input.config.order {
        ColumnOrder::LeftToRight => Box::new(first..=last),
        ColumnOrder::RightToLeft => Box::new((first..=last).rev()),
    };

    // Only valid columns (or the seed) become `previous`. Until the first one,
    // the top is searched over the whole rectangle.
    let jitter = input.config.jitter;
    let mut previous: Option<(usize, usize)> = input.seed.map(|t| (t.clamp(y0, y1), y1));
    let mut first_valid: Option<(usize, usize)> = None;
    let mut leading = Vec::new();
    for x in order {
        let column = input.pass1.column(x);
        let found_top = find_top(&column, input, previous.map(|(t, _)| t));
        let found_bottom = find_bottom(&column, input);

        let level = match (found_top, found_bottom) {
            (Some(t), Some(b)) if b > t => {
                let t = previous.map_or(t, |(p, _)| t.min(p + jitter));
                let t = match input.pass2 {
                    Some((plane, refinement)) => {
                        refine(&plane.column(x), t, refinement, input, previous.map(|(p, _)| p))
                    }
                    None => t,
                };
                if first_valid.is_none() {
                    first_valid = Some((t, b));
                }
                Some((t, b))
            }
            _ => previous,
        };
        match level {
            Some((t, b)) => {
                top[x - first] = t;
                bottom[x - first] = b;
                previous = Some((t, b));
            }
            None => leading.push(x),
        }
    }

    // Invalid columns scanned before any valid one take the first valid level.
    let (t, b) = first_valid.unwrap_or((y0, y1));
    for x in leading {
        top[x - first] = t;
        bottom[x - first] = b;
    }

    ScannedLevels { top, bottom }
}

/// First crossing row top-down. With a previous top the scan starts `jitter`
/// rows above it; the caller limits a deeper hit to `previous + jitter`.
fn find_top(column: &[f32], input: &ScanInput, previous: Option<usize>) -> Option<usize> {
    let (y0, y1) = input.rows;
    let config = input.config;
    let start = match previous {
        Some(p) => p.saturating_sub(config.jitter).max(y0),
        None => y0,
    };
    (start..=y1).find(|&y| config.comparison.crosses(column[y], config.threshold))
}

/// First crossing row scanning upwards from the bottom edge.
fn find_bottom(column: &[f32], input: &ScanInput) -> Option<usize> {
    let (y0, y1) = input.rows;
    let config = input.config;
    (y0..=y1)
        .rev()
        .find(|&y| config.comparison.crosses(column[y], config.threshold))
}

/// Pass-2 top inside `±refinement.jitter` of the pass-1 top, kept within
/// `jitter` of the previous column.
fn refine(
    column: &[f32],
    top: usize,
    refinement: &RefinementConfig,
    input: &ScanInput,
    previous: Option<usize>,
) -> usize {
    let (y0, y1) = input.rows;
    let start = top.saturating_sub(refinement.jitter).max(y0);
    let end = (top + refinement.jitter).min(y1);
    let mut window = start..=end;

    let refined = match refinement.policy {
        RefinePolicy::FirstCrossing {
            threshold,
            comparison,
        } => window.find(|&y| comparison.crosses(column[y], threshold)),
        RefinePolicy::BestScore { mode } => window
            .filter(|&y| column[y].is_finite())
            .fold(None, |best: Option<usize>, y| match best {
                None => Some(y),
                Some(b) => {
                    let better = match mode {
                        ScoreMode::Max => column[y] > column[b],
                        ScoreMode::Min => column[y] < column[b],
                    };
                    Some(if better { y } else { b })
                }
            }),
    }
    .unwrap_or(top);

    match previous {
        Some(p) => {
            let jitter = input.config.jitter;
            refined.clamp(p.saturating_sub(jitter), p + jitter)
        }
        None => refined,
    }
}
