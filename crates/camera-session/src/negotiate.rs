//! Closest-match negotiation of capture parameters

use crate::{CameraError, FrameRateRange, Resolution};
use tracing::{debug, warn};

/// Driver frame rates are fixed-point with this scale
pub const FPS_SCALE: i64 = 1000;

/// Find the supported resolution whose pixel area is closest to `target`.
///
/// Ties keep the first size in the driver's order. An empty list falls back
/// to `current`, the size the driver is using right now.
pub fn closest_resolution(
    supported: &[Resolution],
    target: Resolution,
    current: Option<Resolution>,
) -> Result<Resolution, CameraError> {
    if supported.is_empty() {
        warn!("Device returned no supported sizes; using current size");
        return current.ok_or(CameraError::NoResolutionAvailable);
    }

    let target_area = target.area();
    let mut best: Option<(Resolution, u64)> = None;

    for &size in supported {
        let offset = size.area().abs_diff(target_area);
        if best.map_or(true, |(_, min)| offset < min) {
            best = Some((size, offset));
            if offset == 0 {
                break;
            }
        }
    }

    let (size, offset) = best.ok_or(CameraError::NoResolutionAvailable)?;
    debug!("Closest resolution to {} is {} (area offset {})", target, size, offset);
    Ok(size)
}

/// Find the frame rate closest to `target` (frames per second).
///
/// Ranges are scanned in driver order and the first range containing the
/// target wins outright, even when a later range would also contain it.
/// Otherwise the nearest range bound is returned; a later bound replaces an
/// earlier one only when strictly closer.
pub fn closest_frame_rate(ranges: &[FrameRateRange], target: u32) -> u32 {
    let scaled = target as i64 * FPS_SCALE;
    let mut best: Option<(i64, i64)> = None;

    for range in ranges {
        if range.contains(scaled) {
            return target;
        }
        for bound in [range.min as i64, range.max as i64] {
            let offset = (scaled - bound).abs();
            if best.map_or(true, |(_, min)| offset < min) {
                best = Some((bound, offset));
            }
        }
    }

    match best {
        Some((bound, _)) => {
            debug!("Frame rate {} unsupported, using bound {}", target, bound);
            (bound / FPS_SCALE) as u32
        }
        None => target,
    }
}
