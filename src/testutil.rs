//! Descriptor builders shared by the unit tests.

use crate::element::{CollectionType, Element, ElementDirectory, ElementId};
use crate::usage::*;

pub const REPORT_TOUCH: u8 = 1;
pub const REPORT_PEN: u8 = 2;
pub const REPORT_FEATURE: u8 = 3;

/// Bits per finger slot: tip, in range, confidence, pad, id(8), x(16), y(16).
pub const FINGER_BITS: u32 = 48;

/// Add a finger collection at bit `base` of `report_id`. The tip switch is
/// always the first field.
pub fn add_finger(dir: &mut ElementDirectory, parent: ElementId, report_id: u8, base: u32) -> ElementId {
    let finger = dir.add(Some(parent), Element::collection(CollectionType::Logical, PAGE_DIGITIZER, DIG_FINGER));
    let field = |usage_page, usage, offset, size, max| {
        Element::input(usage_page, usage)
            .with_report(report_id, base + offset, size)
            .with_logical(0, max)
    };
    dir.add(Some(finger), field(PAGE_DIGITIZER, DIG_TIP_SWITCH, 0, 1, 1));
    dir.add(Some(finger), field(PAGE_DIGITIZER, DIG_IN_RANGE, 1, 1, 1));
    dir.add(Some(finger), field(PAGE_DIGITIZER, DIG_CONFIDENCE, 2, 1, 1));
    dir.add(Some(finger), field(PAGE_DIGITIZER, DIG_CONTACT_IDENTIFIER, 8, 8, 255));
    dir.add(Some(finger), field(PAGE_GENERIC_DESKTOP, GD_X, 16, 16, 4095));
    dir.add(Some(finger), field(PAGE_GENERIC_DESKTOP, GD_Y, 32, 16, 4095));
    finger
}

/// Touch screen with `fingers` slots in report 1, an optional contact count
/// after the slots and an optional contact count maximum feature.
pub fn touch_screen(fingers: u32, with_count: bool, max: Option<i32>) -> ElementDirectory {
    let mut dir = ElementDirectory::new();
    let app = dir.add(None, Element::collection(CollectionType::Application, PAGE_DIGITIZER, DIG_TOUCH_SCREEN));
    populate(&mut dir, app, fingers, with_count, max);
    dir
}

/// Touch pad with `fingers` slots, a contact count and a click button.
pub fn touch_screen_with_button(fingers: u32) -> ElementDirectory {
    let mut dir = ElementDirectory::new();
    let app = dir.add(None, Element::collection(CollectionType::Application, PAGE_DIGITIZER, DIG_TOUCH_PAD));
    populate(&mut dir, app, fingers, true, None);
    dir.add(
        Some(app),
        Element::input(PAGE_BUTTON, 1)
            .with_report(REPORT_TOUCH, fingers * FINGER_BITS + 8, 1)
            .with_logical(0, 1),
    );
    dir
}

fn populate(dir: &mut ElementDirectory, app: ElementId, fingers: u32, with_count: bool, max: Option<i32>) {
    for slot in 0..fingers {
        add_finger(dir, app, REPORT_TOUCH, slot * FINGER_BITS);
    }
    if with_count {
        dir.add(
            Some(app),
            Element::input(PAGE_DIGITIZER, DIG_CONTACT_COUNT)
                .with_report(REPORT_TOUCH, fingers * FINGER_BITS, 8)
                .with_logical(0, 255),
        );
    }
    if let Some(max) = max {
        dir.add(
            Some(app),
            Element::feature(PAGE_DIGITIZER, DIG_CONTACT_COUNT_MAXIMUM)
                .with_report(REPORT_FEATURE, 0, 8)
                .with_logical(0, 15)
                .with_value(max),
        );
    }
}

/// Encode one finger slot.
pub fn finger_slot(tip: bool, range: bool, confidence: bool, id: u8, x: u16, y: u16) -> [u8; 6] {
    let flags = tip as u8 | (range as u8) << 1 | (confidence as u8) << 2;
    let [x0, x1] = x.to_le_bytes();
    let [y0, y1] = y.to_le_bytes();
    [flags, id, x0, x1, y0, y1]
}

/// Build a report 1 buffer from finger slots, an optional contact count and
/// an optional button byte.
pub fn touch_report(slots: &[[u8; 6]], count: Option<u8>, button: Option<u8>) -> Vec<u8> {
    let mut report = vec![REPORT_TOUCH];
    for slot in slots {
        report.extend_from_slice(slot);
    }
    report.extend(count);
    report.extend(button);
    report
}

/// Pen digitizer in report 2:
/// tip(0) barrel(1) invert(2) eraser(3) in range(4), x(8..24), y(24..40),
/// pressure(40..56), tilt x(56..64), tilt y(64..72).
pub fn pen_digitizer() -> ElementDirectory {
    let mut dir = ElementDirectory::new();
    let app = dir.add(None, Element::collection(CollectionType::Application, PAGE_DIGITIZER, DIG_PEN));
    let stylus = dir.add(Some(app), Element::collection(CollectionType::Physical, PAGE_DIGITIZER, DIG_STYLUS));
    let bit = |usage, offset| {
        Element::input(PAGE_DIGITIZER, usage)
            .with_report(REPORT_PEN, offset, 1)
            .with_logical(0, 1)
    };
    dir.add(Some(stylus), bit(DIG_TIP_SWITCH, 0));
    dir.add(Some(stylus), bit(DIG_BARREL_SWITCH, 1));
    dir.add(Some(stylus), bit(DIG_INVERT, 2));
    dir.add(Some(stylus), bit(DIG_ERASER, 3));
    dir.add(Some(stylus), bit(DIG_IN_RANGE, 4));
    dir.add(
        Some(stylus),
        Element::input(PAGE_GENERIC_DESKTOP, GD_X).with_report(REPORT_PEN, 8, 16).with_logical(0, 20000),
    );
    dir.add(
        Some(stylus),
        Element::input(PAGE_GENERIC_DESKTOP, GD_Y).with_report(REPORT_PEN, 24, 16).with_logical(0, 15000),
    );
    dir.add(
        Some(stylus),
        Element::input(PAGE_DIGITIZER, DIG_TIP_PRESSURE).with_report(REPORT_PEN, 40, 16).with_logical(0, 4095),
    );
    for (usage, offset) in [(DIG_X_TILT, 56), (DIG_Y_TILT, 64)] {
        dir.add(
            Some(stylus),
            Element::input(PAGE_DIGITIZER, usage)
                .with_report(REPORT_PEN, offset, 8)
                .with_logical(-60, 60)
                .with_physical(-6000, 6000),
        );
    }
    dir
}

pub const PEN_TIP: u8 = 1 << 0;
pub const PEN_BARREL: u8 = 1 << 1;
pub const PEN_INVERT: u8 = 1 << 2;
pub const PEN_IN_RANGE: u8 = 1 << 4;

pub fn pen_report(flags: u8, x: u16, y: u16, pressure: u16, tilt_x: i8, tilt_y: i8) -> Vec<u8> {
    let mut report = vec![REPORT_PEN, flags];
    report.extend_from_slice(&x.to_le_bytes());
    report.extend_from_slice(&y.to_le_bytes());
    report.extend_from_slice(&pressure.to_le_bytes());
    report.push(tilt_x as u8);
    report.push(tilt_y as u8);
    report
}
