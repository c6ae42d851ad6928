use crate::gulps::Gulp;
use crate::measure::{Level2D, Level2DBuilder};

/// Per-index gulp measures over the index range of a derivative series.
#[derive(Debug, Clone, PartialEq)]
pub struct GulpSummary {
    /// Gulps starting at each index.
    pub count: Level2D,
    pub cumulative_count: Level2D,
    pub cumulative_amplitude: Level2D,
    /// Indices from the start of the range to the first gulp.
    pub time_to_first_gulp: Option<usize>,
}

impl GulpSummary {
    pub fn new(gulps: &[Gulp], first_index: usize, len: usize) -> Self {
        let mut count = Level2DBuilder::with_capacity(first_index, len);
        let mut cumulative_count = Level2DBuilder::with_capacity(first_index, len);
        let mut cumulative_amplitude = Level2DBuilder::with_capacity(first_index, len);

        let mut starts = gulps.iter().peekable();
        let (mut total, mut amplitude) = (0.0, 0.0);
        for index in first_index..first_index + len {
            let mut here = 0.0;
            while let Some(gulp) = starts.next_if(|g| g.start_index <= index) {
                if gulp.start_index == index {
                    here += 1.0;
                    amplitude += gulp.amplitude;
                }
            }
            total += here;
            count.push(here);
            cumulative_count.push(total);
            cumulative_amplitude.push(amplitude);
        }

        let time_to_first_gulp = gulps
            .iter()
            .map(|g| g.start_index)
            .filter(|&s| s >= first_index && s < first_index + len)
            .min()
            .map(|s| s - first_index);

        Self {
            count: count.freeze(),
            cumulative_count: cumulative_count.freeze(),
            cumulative_amplitude: cumulative_amplitude.freeze(),
            time_to_first_gulp,
        }
    }

    /// Summary over the capillary's derivative range; `None` without derivative.
    pub fn of(capillary: &crate::capillary::Capillary) -> Option<Self> {
        let derivative = capillary.measures.derivative.as_ref()?;
        Some(Self::new(&capillary.gulps, derivative.first_index(), derivative.len()))
    }
}
