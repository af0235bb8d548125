//! Colour legends of the inundation-depth rasters and the depth → level
//! thresholds for each hazard type.
//!
//! Each legend entry maps the published band colour to the upper bound of
//! its depth band in metres.

use crate::models::{HazardLevel, HazardType};

pub type Rgb = [u8; 3];

/// Matches further than this (Euclidean RGB) are rejected.
pub const MAX_COLOR_DISTANCE: f64 = 50.0;

pub struct LegendEntry {
    pub color: Rgb,
    pub depth_meters: f64,
}

const fn entry(r: u8, g: u8, b: u8, depth_meters: f64) -> LegendEntry {
    LegendEntry {
        color: [r, g, b],
        depth_meters,
    }
}

pub static TSUNAMI_LEGEND: &[LegendEntry] = &[
    entry(255, 255, 179, 0.3),
    entry(247, 245, 169, 0.5),
    entry(248, 225, 166, 1.0),
    entry(255, 216, 192, 3.0),
    entry(255, 183, 183, 5.0),
    entry(255, 145, 145, 10.0),
    entry(242, 133, 201, 20.0),
    entry(220, 122, 220, 30.0),
];

pub static FLOOD_LEGEND: &[LegendEntry] = &[
    entry(247, 245, 169, 0.5),
    entry(255, 216, 192, 3.0),
    entry(255, 183, 183, 5.0),
    entry(255, 145, 145, 10.0),
    entry(242, 133, 201, 20.0),
    entry(220, 122, 220, 30.0),
];

pub static HIGH_TIDE_LEGEND: &[LegendEntry] = &[
    entry(247, 245, 169, 0.5),
    entry(248, 225, 166, 1.0),
    entry(255, 216, 192, 3.0),
    entry(255, 183, 183, 5.0),
    entry(255, 145, 145, 10.0),
    entry(242, 133, 201, 20.0),
];

/// `(min_depth, level)` pairs, highest first.
type Thresholds = [(f64, HazardLevel); 4];

const TSUNAMI_THRESHOLDS: Thresholds = [
    (10.0, HazardLevel::Extreme),
    (5.0, HazardLevel::High),
    (2.0, HazardLevel::Medium),
    (0.3, HazardLevel::Low),
];

const FLOOD_THRESHOLDS: Thresholds = [
    (5.0, HazardLevel::Extreme),
    (3.0, HazardLevel::High),
    (1.0, HazardLevel::Medium),
    (0.5, HazardLevel::Low),
];

pub fn legend_for(hazard_type: HazardType) -> Option<&'static [LegendEntry]> {
    match hazard_type {
        HazardType::Tsunami => Some(TSUNAMI_LEGEND),
        HazardType::Flood | HazardType::InternalFlood => Some(FLOOD_LEGEND),
        HazardType::HighTide => Some(HIGH_TIDE_LEGEND),
        HazardType::Landslide | HazardType::Avalanche => None,
    }
}

fn color_distance(a: Rgb, b: Rgb) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Depth of the nearest legend colour, or `None` when nothing is within
/// [`MAX_COLOR_DISTANCE`].
pub fn match_depth(legend: &[LegendEntry], pixel: Rgb) -> Option<f64> {
    legend
        .iter()
        .map(|e| (color_distance(e.color, pixel), e.depth_meters))
        .filter(|&(distance, _)| distance <= MAX_COLOR_DISTANCE)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, depth)| depth)
}

pub fn level_for_depth(hazard_type: HazardType, depth_meters: f64) -> HazardLevel {
    let thresholds = match hazard_type {
        HazardType::Tsunami => &TSUNAMI_THRESHOLDS,
        _ => &FLOOD_THRESHOLDS,
    };
    thresholds
        .iter()
        .find(|(min, _)| depth_meters >= *min)
        .map(|&(_, level)| level)
        .unwrap_or(HazardLevel::None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_colors_decode_to_their_depth() {
        for (hazard_type, legend) in [
            (HazardType::Tsunami, TSUNAMI_LEGEND),
            (HazardType::Flood, FLOOD_LEGEND),
            (HazardType::HighTide, HIGH_TIDE_LEGEND),
        ] {
            for e in legend {
                assert_eq!(
                    match_depth(legend, e.color),
                    Some(e.depth_meters),
                    "{hazard_type} {:?}",
                    e.color
                );
            }
        }
    }

    #[test]
    fn far_color_is_no_hazard() {
        // Pure blue is > 50 away from every legend colour.
        assert_eq!(match_depth(FLOOD_LEGEND, [0, 0, 255]), None);
        assert_eq!(match_depth(TSUNAMI_LEGEND, [0, 128, 0]), None);
    }

    #[test]
    fn near_color_snaps_to_nearest() {
        assert_eq!(match_depth(FLOOD_LEGEND, [250, 180, 180]), Some(5.0));
    }

    #[test]
    fn same_color_different_depth_per_type() {
        let c = [248, 225, 166];
        assert_eq!(match_depth(TSUNAMI_LEGEND, c), Some(1.0));
        assert_eq!(match_depth(HIGH_TIDE_LEGEND, c), Some(1.0));
        // Flood has no 0.5–1 m band; the nearest band is 0.5 m.
        assert_eq!(match_depth(FLOOD_LEGEND, c), Some(0.5));
    }

    #[test]
    fn tsunami_thresholds() {
        assert_eq!(level_for_depth(HazardType::Tsunami, 12.0), HazardLevel::Extreme);
        assert_eq!(level_for_depth(HazardType::Tsunami, 10.0), HazardLevel::Extreme);
        assert_eq!(level_for_depth(HazardType::Tsunami, 6.0), HazardLevel::High);
        assert_eq!(level_for_depth(HazardType::Tsunami, 2.0), HazardLevel::Medium);
        assert_eq!(level_for_depth(HazardType::Tsunami, 0.3), HazardLevel::Low);
        assert_eq!(level_for_depth(HazardType::Tsunami, 0.1), HazardLevel::None);
    }

    #[test]
    fn flood_thresholds() {
        assert_eq!(level_for_depth(HazardType::Flood, 5.0), HazardLevel::Extreme);
        assert_eq!(level_for_depth(HazardType::Flood, 3.0), HazardLevel::High);
        assert_eq!(level_for_depth(HazardType::HighTide, 1.0), HazardLevel::Medium);
        assert_eq!(level_for_depth(HazardType::Flood, 0.5), HazardLevel::Low);
        assert_eq!(level_for_depth(HazardType::Flood, 0.4), HazardLevel::None);
    }
}
