//! # Resolution Planning Module
//!
//! Calcola la risoluzione di output di un video rispettando i limiti massimi
//! configurati e preservando l'aspect ratio.
//!
//! ## Regole:
//! - Mai upscaling: se la sorgente è già nei limiti, la risoluzione resta invariata
//! - Altrimenti fattore di scala = `min(max_w / w, max_h / h)` applicato a entrambe le dimensioni
//! - Arrotondamento al pari più vicino (x265 con chroma 4:2:0 richiede dimensioni pari)
//! - Il risultato non supera mai i massimi

use crate::config::Config;
use crate::error::CompressError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel dimensions of a video stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn fits_within(&self, bounds: Resolution) -> bool {
        self.width <= bounds.width && self.height <= bounds.height
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Computes target resolutions against a fixed bound
#[derive(Debug, Clone, Copy)]
pub struct ResolutionPlanner {
    bounds: Resolution,
}

impl ResolutionPlanner {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            bounds: Resolution::new(max_width, max_height),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_width, config.max_height)
    }

    pub fn bounds(&self) -> Resolution {
        self.bounds
    }

    /// Target resolution for a source of the given size
    pub fn plan(&self, source: Resolution) -> Result<Resolution, CompressError> {
        plan(source.width, source.height, self.bounds.width, self.bounds.height)
    }
}

/// Target (width, height) for a source, bounded by (max_width, max_height).
pub fn plan(
    source_width: u32,
    source_height: u32,
    max_width: u32,
    max_height: u32,
) -> Result<Resolution, CompressError> {
    if source_width == 0 || source_height == 0 {
        return Err(CompressError::Probe(format!(
            "invalid source dimensions {}x{}",
            source_width, source_height
        )));
    }
    if max_width < 2 || max_height < 2 {
        return Err(CompressError::Validation(format!(
            "maximum resolution {}x{} is below 2x2",
            max_width, max_height
        )));
    }

    let source = Resolution::new(source_width, source_height);
    if source.fits_within(Resolution::new(max_width, max_height)) {
        return Ok(source);
    }

    let scale = f64::min(
        max_width as f64 / source_width as f64,
        max_height as f64 / source_height as f64,
    );

    Ok(Resolution::new(
        round_even(source_width as f64 * scale, max_width),
        round_even(source_height as f64 * scale, max_height),
    ))
}

/// Nearest even integer, never above the largest even value <= `max`
fn round_even(value: f64, max: u32) -> u32 {
    let even = ((value / 2.0).round() as u32).saturating_mul(2);
    even.min(max & !1).max(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_1080p_into_720p() {
        assert_eq!(plan(1920, 1080, 1280, 720).unwrap(), Resolution::new(1280, 720));
    }

    #[test]
    fn test_within_bounds_is_unchanged() {
        assert_eq!(plan(640, 480, 1280, 720).unwrap(), Resolution::new(640, 480));
        assert_eq!(plan(1280, 720, 1280, 720).unwrap(), Resolution::new(1280, 720));
        // odd sources inside the bounds are left exactly as they are
        assert_eq!(plan(641, 361, 1280, 720).unwrap(), Resolution::new(641, 361));
    }

    #[test]
    fn test_no_upscaling() {
        let target = plan(320, 240, 3840, 2160).unwrap();
        assert_eq!(target, Resolution::new(320, 240));
    }

    #[test]
    fn test_portrait_is_bounded_by_height() {
        // 1080x1920 portrait into 1920x1080: height limits the scale
        let target = plan(1080, 1920, 1920, 1080).unwrap();
        assert_eq!(target, Resolution::new(608, 1080));
    }

    #[test]
    fn test_only_one_dimension_over() {
        // 4:3 at 1440x1080 into 1280x1080: width limits
        let target = plan(1440, 1080, 1280, 1080).unwrap();
        assert_eq!(target, Resolution::new(1280, 960));
    }

    #[test]
    fn test_odd_maximum_is_respected() {
        let target = plan(1920, 1080, 1279, 719).unwrap();
        assert!(target.width <= 1279 && target.height <= 719);
        assert_eq!(target.width % 2, 0);
        assert_eq!(target.height % 2, 0);
    }

    #[test]
    fn test_zero_dimensions_are_unplannable() {
        assert!(matches!(plan(0, 1080, 1920, 1080), Err(CompressError::Probe(_))));
        assert!(matches!(plan(1920, 0, 1920, 1080), Err(CompressError::Probe(_))));
    }

    #[test]
    fn test_bounds_below_two_pixels_are_rejected() {
        assert!(matches!(plan(1920, 1080, 1, 720), Err(CompressError::Validation(_))));
        assert!(matches!(plan(1920, 1080, 1280, 0), Err(CompressError::Validation(_))));
        assert_eq!(plan(1920, 1080, 2, 2).unwrap(), Resolution::new(2, 2));
    }

    #[test]
    fn test_bounds_and_aspect_hold_across_sizes() {
        let sources = [
            (3840, 2160), (4096, 2160), (1920, 1080), (1920, 800), (1440, 1080),
            (720, 1280), (7680, 4320), (1998, 1080), (2560, 1600), (5000, 3),
            (3, 5000), (1001, 999),
        ];
        let bounds = [(1920, 1080), (1280, 720), (854, 480), (1279, 719), (640, 640)];

        for &(sw, sh) in &sources {
            for &(mw, mh) in &bounds {
                let target = plan(sw, sh, mw, mh).unwrap();
                assert!(target.width <= mw, "{}x{} in {}x{} -> {}", sw, sh, mw, mh, target);
                assert!(target.height <= mh, "{}x{} in {}x{} -> {}", sw, sh, mw, mh, target);

                if sw <= mw && sh <= mh {
                    assert_eq!(target, Resolution::new(sw, sh));
                    continue;
                }

                assert_eq!(target.width % 2, 0);
                assert_eq!(target.height % 2, 0);

                let scale = f64::min(mw as f64 / sw as f64, mh as f64 / sh as f64);
                let exact_w = sw as f64 * scale;
                let exact_h = sh as f64 * scale;
                assert!((target.width as f64 - exact_w).abs() <= 2.0, "{}x{} -> {}", sw, sh, target);
                assert!((target.height as f64 - exact_h).abs() <= 2.0, "{}x{} -> {}", sw, sh, target);
            }
        }
    }

    #[test]
    fn test_planner_uses_config_bounds() {
        let config = Config {
            max_width: 1280,
            max_height: 720,
            ..Default::default()
        };
        let planner = ResolutionPlanner::from_config(&config);
        assert_eq!(planner.bounds(), Resolution::new(1280, 720));
        assert_eq!(planner.plan(Resolution::new(3840, 2160)).unwrap(), Resolution::new(1280, 720));
        assert_eq!(Resolution::new(1280, 720).to_string(), "1280x720");
    }
}
