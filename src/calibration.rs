//! Justified range calibration for pressure and axis elements.

use crate::element::Element;

/// Default share of an axis range trimmed away, split evenly between both ends.
pub const DEFAULT_REMOVAL_PERCENTAGE: u8 = 15;

/// Narrow the effective range of `element` by `removal_percentage` percent.
///
/// The trim is always computed from the descriptor's declared bounds, so
/// repeated calls with the same percentage give the same result.
pub fn calibrate(element: &mut Element, removal_percentage: u8) {
    let (min, max) = element.raw_logical_range();
    if removal_percentage == 0 || min == max {
        return;
    }
    let (lo, hi) = (min.min(max) as i64, min.max(max) as i64);
    let percentage = removal_percentage.min(100) as i64;

    let delta = (hi - lo) * percentage / 100;
    let mut sat_min = lo + delta / 2;
    let mut sat_max = hi - delta / 2;
    if sat_max <= sat_min {
        sat_min = lo + (hi - lo) / 2;
        sat_max = sat_min + 1;
    }

    log::debug!(
        "Calibrated element {:#04x}/{:#04x}: [{}, {}] -> [{}, {}]",
        element.usage_page(),
        element.usage(),
        lo,
        hi,
        sat_min,
        sat_max
    );
    element.set_calibration(sat_min as i32, sat_max as i32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::*;

    fn pressure(min: i32, max: i32) -> Element {
        Element::input(PAGE_DIGITIZER, DIG_TIP_PRESSURE).with_logical(min, max)
    }

    #[test]
    fn test_symmetric_trim() {
        let mut element = pressure(0, 1000);
        calibrate(&mut element, 20);
        assert_eq!((element.logical_min(), element.logical_max()), (100, 900));
    }

    #[test]
    fn test_calibration_is_idempotent() {
        let mut element = pressure(0, 4095);
        calibrate(&mut element, 15);
        let once = (element.logical_min(), element.logical_max());
        calibrate(&mut element, 15);
        assert_eq!((element.logical_min(), element.logical_max()), once);
        assert_eq!(element.raw_logical_range(), (0, 4095));
    }

    #[test]
    fn test_zero_percentage_and_degenerate_range_are_noops() {
        let mut element = pressure(0, 255);
        calibrate(&mut element, 0);
        assert_eq!(element.calibration(), None);

        let mut flat = pressure(7, 7);
        calibrate(&mut flat, 50);
        assert_eq!(flat.calibration(), None);
    }

    #[test]
    fn test_full_removal_never_inverts() {
        let mut element = pressure(0, 10);
        calibrate(&mut element, 100);
        assert!(element.logical_min() < element.logical_max());

        let mut element = pressure(-127, 127);
        calibrate(&mut element, 250);
        assert_eq!((element.logical_min(), element.logical_max()), (0, 1));
    }
}
