//! HID usage pages and usages referenced by the digitizer parser.
//!
//! Values come from the HID Usage Tables, sections "Generic Desktop Page (0x01)",
//! "Button Page (0x09)" and "Digitizers Page (0x0D)".

pub const PAGE_GENERIC_DESKTOP: u16 = 0x01;
pub const PAGE_BUTTON: u16 = 0x09;
pub const PAGE_DIGITIZER: u16 = 0x0d;

pub const GD_X: u16 = 0x30;
pub const GD_Y: u16 = 0x31;

// Digitizer application collections
pub const DIG_DIGITIZER: u16 = 0x01;
pub const DIG_PEN: u16 = 0x02;
pub const DIG_LIGHT_PEN: u16 = 0x03;
pub const DIG_TOUCH_SCREEN: u16 = 0x04;
pub const DIG_TOUCH_PAD: u16 = 0x05;
pub const DIG_WHITEBOARD: u16 = 0x06;
pub const DIG_COORDINATE_MEASURING_MACHINE: u16 = 0x07;
pub const DIG_3D_DIGITIZER: u16 = 0x08;
pub const DIG_STEREO_PLOTTER: u16 = 0x09;
pub const DIG_ARTICULATED_ARM: u16 = 0x0a;
pub const DIG_ARMATURE: u16 = 0x0b;
pub const DIG_MULTIPLE_POINT_DIGITIZER: u16 = 0x0c;
pub const DIG_FREE_SPACE_WAND: u16 = 0x0d;
pub const DIG_DEVICE_CONFIGURATION: u16 = 0x0e;

// Transducer collections
pub const DIG_STYLUS: u16 = 0x20;
pub const DIG_PUCK: u16 = 0x21;
pub const DIG_FINGER: u16 = 0x22;

// Transducer fields
pub const DIG_TIP_PRESSURE: u16 = 0x30;
pub const DIG_BARREL_PRESSURE: u16 = 0x31;
pub const DIG_IN_RANGE: u16 = 0x32;
pub const DIG_TOUCH: u16 = 0x33;
pub const DIG_TRANSDUCER_INDEX: u16 = 0x38;
pub const DIG_INVERT: u16 = 0x3c;
pub const DIG_X_TILT: u16 = 0x3d;
pub const DIG_Y_TILT: u16 = 0x3e;
pub const DIG_TWIST: u16 = 0x41;
pub const DIG_TIP_SWITCH: u16 = 0x42;
pub const DIG_SECONDARY_TIP_SWITCH: u16 = 0x43;
pub const DIG_BARREL_SWITCH: u16 = 0x44;
pub const DIG_ERASER: u16 = 0x45;
/// Called "Touch Valid" in older tables.
pub const DIG_CONFIDENCE: u16 = 0x47;
pub const DIG_WIDTH: u16 = 0x48;
pub const DIG_HEIGHT: u16 = 0x49;
pub const DIG_CONTACT_IDENTIFIER: u16 = 0x51;
pub const DIG_SECONDARY_BARREL_SWITCH: u16 = 0x5a;

// Device-wide controls
pub const DIG_DEVICE_MODE: u16 = 0x52;
pub const DIG_CONTACT_COUNT: u16 = 0x54;
pub const DIG_CONTACT_COUNT_MAXIMUM: u16 = 0x55;

/// Device Mode value selecting multi-input (Windows precision touchpad) reporting.
pub const DEVICE_MODE_MULTI_INPUT: i32 = 0x03;

/// Digitizer-page application collections that describe a whole digitizer.
pub fn is_digitizer_application(usage: u16) -> bool {
    matches!(
        usage,
        DIG_DIGITIZER
            | DIG_PEN
            | DIG_LIGHT_PEN
            | DIG_TOUCH_SCREEN
            | DIG_TOUCH_PAD
            | DIG_WHITEBOARD
            | DIG_COORDINATE_MEASURING_MACHINE
            | DIG_3D_DIGITIZER
            | DIG_STEREO_PLOTTER
            | DIG_ARTICULATED_ARM
            | DIG_ARMATURE
            | DIG_MULTIPLE_POINT_DIGITIZER
            | DIG_FREE_SPACE_WAND
    )
}

pub fn is_transducer_collection(usage: u16) -> bool {
    matches!(usage, DIG_STYLUS | DIG_PUCK | DIG_FINGER)
}
