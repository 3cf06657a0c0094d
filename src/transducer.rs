//! Per-contact transducer state.

use std::fmt;

use crate::element::{ElementId, Timestamp};

/// Button bit used by the barrel switch.
pub const BUTTON_BARREL: u32 = 1;
/// Button bit used by the eraser switch and the secondary barrel switch.
pub const BUTTON_ERASER: u32 = 2;
/// Button bit used by the secondary tip switch.
pub const BUTTON_SECONDARY_TIP: u32 = 3;

const BUTTON_BITS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransducerType {
    Finger,
    Stylus,
    Puck,
}

impl fmt::Display for TransducerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransducerType::Finger => write!(f, "finger"),
            TransducerType::Stylus => write!(f, "stylus"),
            TransducerType::Puck => write!(f, "puck"),
        }
    }
}

/// A boolean that remembers when it last changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Edge {
    pub value: bool,
    pub timestamp: Timestamp,
}

impl Edge {
    /// Returns true if the value changed.
    pub fn update(&mut self, value: bool, timestamp: Timestamp) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        self.timestamp = timestamp;
        true
    }
}

/// Current and previous value of an axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Axis<T> {
    pub value: T,
    pub last: T,
    pub timestamp: Timestamp,
}

impl<T: Copy> Axis<T> {
    pub fn update(&mut self, value: T, timestamp: Timestamp) {
        self.last = self.value;
        self.value = value;
        self.timestamp = timestamp;
    }

    /// Forget the previous value, as if `value` had always been current.
    pub fn reset(&mut self) {
        self.last = self.value;
    }
}

/// Button bitmask with one edge timestamp per bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonState {
    pub bits: u32,
    pub edges: [Timestamp; BUTTON_BITS],
}

impl Default for ButtonState {
    fn default() -> Self {
        Self {
            bits: 0,
            edges: [0; BUTTON_BITS],
        }
    }
}

impl ButtonState {
    pub fn is_set(&self, bit: u32) -> bool {
        bit < BUTTON_BITS as u32 && self.bits & (1 << bit) != 0
    }
}

/// Write `value` into `bit` of `state`.
///
/// The bit and its edge timestamp only change when the value differs from
/// the current one. Bits past the mask width are ignored.
pub fn set_button_state(state: ButtonState, bit: u32, value: bool, timestamp: Timestamp) -> ButtonState {
    if bit >= BUTTON_BITS as u32 || state.is_set(bit) == value {
        return state;
    }
    let mut next = state;
    next.bits ^= 1 << bit;
    next.edges[bit as usize] = timestamp;
    next
}

/// Elements bound to a transducer during descriptor parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransducerElements {
    pub x: Option<ElementId>,
    pub y: Option<ElementId>,
    pub tip_pressure: Option<ElementId>,
    pub barrel_pressure: Option<ElementId>,
    pub tilt_x: Option<ElementId>,
    pub tilt_y: Option<ElementId>,
    pub twist: Option<ElementId>,
    pub width: Option<ElementId>,
    pub height: Option<ElementId>,
    pub tip_switch: Option<ElementId>,
    pub in_range: Option<ElementId>,
    pub confidence: Option<ElementId>,
    pub identifier: Option<ElementId>,
    pub invert: Option<ElementId>,
    pub buttons: Vec<(ElementId, u32)>,
}

#[derive(Debug, Clone)]
pub struct Transducer {
    pub id: usize,
    /// Multitouch slot: position among the finger transducers.
    pub slot: usize,
    pub kind: TransducerType,
    pub collection: ElementId,
    pub report_id: u8,
    pub logical_max_x: i32,
    pub logical_max_y: i32,
    pub elements: TransducerElements,
    /// No in-range field: range follows the tip switch.
    pub range_from_touch: bool,

    pub x: Axis<i32>,
    pub y: Axis<i32>,
    pub tip_pressure: Axis<f32>,
    pub barrel_pressure: Axis<f32>,
    pub tilt_x: Axis<f32>,
    pub tilt_y: Axis<f32>,
    pub twist: Axis<f32>,
    pub width: Axis<f32>,
    pub height: Axis<f32>,
    pub buttons: ButtonState,
    pub touch: Edge,
    pub range: Edge,
    pub confidence: bool,
    pub is_valid: bool,
    pub inverted: bool,
    pub contact_id: Option<i32>,
    /// Incremented on every touch-down.
    pub stroke: u32,
    pub timestamp: Timestamp,
}

impl Transducer {
    pub fn new(id: usize, kind: TransducerType, collection: ElementId, report_id: u8) -> Self {
        Self {
            id,
            slot: 0,
            kind,
            collection,
            report_id,
            logical_max_x: 0,
            logical_max_y: 0,
            elements: TransducerElements::default(),
            range_from_touch: false,
            x: Axis::default(),
            y: Axis::default(),
            tip_pressure: Axis::default(),
            barrel_pressure: Axis::default(),
            tilt_x: Axis::default(),
            tilt_y: Axis::default(),
            twist: Axis::default(),
            width: Axis::default(),
            height: Axis::default(),
            buttons: ButtonState::default(),
            touch: Edge::default(),
            range: Edge::default(),
            confidence: true,
            is_valid: false,
            inverted: false,
            contact_id: None,
            stroke: 0,
            timestamp: 0,
        }
    }

    /// True when the transducer is a valid, committed touch.
    pub fn is_down(&self) -> bool {
        self.is_valid && self.touch.value
    }

    /// Apply new range and tip states, keeping touch within range.
    pub fn set_contact(&mut self, range: bool, tip: bool, timestamp: Timestamp) {
        self.range.update(range, timestamp);
        if self.touch.update(tip && range, timestamp) && self.touch.value {
            self.stroke = self.stroke.wrapping_add(1);
        }
    }

    /// Treat the current stroke as lifted and immediately restarted.
    pub fn restart_stroke(&mut self, timestamp: Timestamp) {
        self.touch.update(false, timestamp);
        self.touch.update(true, timestamp);
        self.stroke = self.stroke.wrapping_add(1);
        for axis in [&mut self.x, &mut self.y] {
            axis.reset();
        }
        for axis in [
            &mut self.tip_pressure,
            &mut self.barrel_pressure,
            &mut self.tilt_x,
            &mut self.tilt_y,
            &mut self.twist,
            &mut self.width,
            &mut self.height,
        ] {
            axis.reset();
        }
    }
}
