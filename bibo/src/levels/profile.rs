use common::{BatchReport, Buffer2, WorkerPool};

use super::{detect_on_planes, score_planes, store_levels, LevelConfig};
use crate::capillary::Capillary;
use crate::error::{Error, FrameError};
use crate::image::{FrameSource, ImageTransform};
use crate::kymograph::KymographConfig;
use crate::mask::{profile_image, MaskGeometry};
use crate::timing::BinTiming;

/// Scored profile of one capillary at one bin.
enum ProfileColumn {
    Scored {
        pass1: Vec<f32>,
        pass2: Option<Vec<f32>>,
    },
    NoGeometry,
    Unavailable(ImageTransform),
}

/// Detects levels without a kymograph, straight from the frames.
///
/// The report counts bins; skipped capillaries are logged.
///
/// Every bin's frame is sampled through each capillary's masks into a
/// one-pixel-wide profile image which is scored like a kymograph column. Bins
/// whose frame failed, or where a capillary has no geometry, become invalid
/// columns and repeat the previous level.
pub fn detect_levels_from_frames(
    capillaries: &mut [Capillary],
    source: &dyn FrameSource,
    timing: &BinTiming,
    kymograph: &KymographConfig,
    config: &LevelConfig,
) -> Result<BatchReport, Error> {
    config.validate();
    kymograph.validate();
    if capillaries.is_empty() {
        return Err(Error::NoCapillaries);
    }
    if source.frame_count() == 0 {
        return Err(Error::NoFrames);
    }
    let bin_count = timing.bin_count();
    if bin_count == 0 {
        return Err(Error::EmptyTiming);
    }

    let (width, height) = source.dimensions()?;
    let geometry = MaskGeometry::new(width, height, kymograph.mask_radius);
    for capillary in capillaries.iter_mut() {
        capillary.along_t.rebuild_masks(&geometry);
    }

    let frames = timing.frames_for_bins(&source.timestamps_ms());
    let pool = WorkerPool::new("frame-levels")?;
    tracing::info!(
        bins = bin_count,
        capillaries = capillaries.len(),
        "detecting levels on frame profiles"
    );

    let shared: &[Capillary] = capillaries;
    let results = pool.run(&frames, |bin, frame| -> Result<Vec<ProfileColumn>, FrameError> {
        let frame = frame.ok_or(FrameError::OutOfRange { index: bin, count: 0 })?;
        let image = source.read_frame(frame)?;
        let columns = shared
            .iter()
            .map(|capillary| {
                let Some(entry) = capillary.along_t.at(frame).filter(|e| !e.masks.is_empty())
                else {
                    return ProfileColumn::NoGeometry;
                };
                match score_planes(&profile_image(&image, &entry.masks), config) {
                    Ok((pass1, pass2)) => ProfileColumn::Scored {
                        pass1: pass1.into_vec(),
                        pass2: pass2.map(Buffer2::into_vec),
                    },
                    Err(transform) => ProfileColumn::Unavailable(transform),
                }
            })
            .collect();
        Ok(columns)
    });
    let report = BatchReport::from_results(&results);

    let mut skipped = 0;
    for (index, capillary) in capillaries.iter_mut().enumerate() {
        let unavailable = results.iter().flatten().find_map(|columns| match &columns[index] {
            ProfileColumn::Unavailable(transform) => Some(*transform),
            _ => None,
        });
        if let Some(transform) = unavailable {
            tracing::warn!(
                capillary = %capillary.name,
                %transform,
                "transform not applicable to frame profile, capillary skipped"
            );
            skipped += 1;
            continue;
        }

        let rows = capillary.along_t.max_mask_count();
        let mut pass1 = Buffer2::new_filled(bin_count, rows, f32::NAN);
        let mut pass2 = config
            .refinement
            .map(|_| Buffer2::new_filled(bin_count, rows, f32::NAN));
        for (bin, result) in results.iter().enumerate() {
            let Ok(columns) = result else { continue };
            if let ProfileColumn::Scored {
                pass1: column,
                pass2: refined,
            } = &columns[index]
            {
                pass1.set_column(bin, column);
                if let (Some(plane), Some(refined)) = (pass2.as_mut(), refined) {
                    plane.set_column(bin, refined);
                }
            }
        }

        match detect_on_planes(capillary, &pass1, pass2.as_ref(), config) {
            Ok(detected) => store_levels(capillary, detected, config),
            Err(err) => {
                tracing::warn!(error = %err, "frame levels skipped");
                skipped += 1;
            }
        }
    }

    tracing::debug!(
        completed = report.completed,
        failed = report.failed,
        skipped,
        "frame levels detected"
    );
    Ok(report)
}
