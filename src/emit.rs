//! Translate decoded frames into Linux input events.
//!
//! Native multitouch fingers use the slotted protocol: each finger keeps
//! its slot, a tracking ID lives for one stroke and -1 ends it. Everything
//! else is reported as single pointer state.

use evdevil::event::{Abs, AbsEvent, EventType, InputEvent, Key, KeyEvent, KeyState};

use crate::digitizer::DigitizerSummary;
use crate::tracker::Frame;
use crate::transducer::{Transducer, TransducerType, BUTTON_BARREL, BUTTON_ERASER};

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_ABS: u16 = 0x03;
pub const SYN_REPORT: u16 = 0;

/// Slots handed to the host. Finger transducers past this are dropped.
pub const MT_SLOTS: usize = 16;
pub const PRESSURE_MAX: i32 = 4095;
pub const MT_PRESSURE_MAX: i32 = 255;

const BUTTON_PRIMARY: u32 = 0;
const BUTTON_TERTIARY: u32 = 2;

/// Events produced for one frame. Per-slot events are kept apart so a
/// uinput writer can address slots itself.
#[derive(Debug, Default)]
pub struct FrameEvents {
    pub slots: Vec<(u16, Vec<InputEvent>)>,
    pub events: Vec<InputEvent>,
}

impl FrameEvents {
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.events.is_empty()
    }

    /// The frame as a plain event stream ending with SYN_REPORT.
    pub fn flatten(&self) -> Vec<InputEvent> {
        let mut out: Vec<InputEvent> = Vec::new();
        for (slot, events) in &self.slots {
            out.push(AbsEvent::new(Abs::MT_SLOT, *slot as i32).into());
            out.extend(events.iter().cloned());
        }
        out.extend(self.events.iter().cloned());
        out.push(InputEvent::new(EventType::from_raw(EV_SYN), SYN_REPORT, 0));
        out
    }
}

#[derive(Debug, Clone, Copy)]
struct Tracking {
    id: i32,
    stroke: u32,
}

/// Remembers which strokes have been announced to the host.
#[derive(Debug)]
pub struct EventEmitter {
    tracking: Vec<Option<Tracking>>,
    next_tracking_id: i32,
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventEmitter {
    pub fn new() -> Self {
        Self {
            tracking: vec![None; MT_SLOTS],
            next_tracking_id: 0,
        }
    }

    pub fn frame_events(&mut self, digitizer: &DigitizerSummary, frame: &Frame) -> FrameEvents {
        let mut out = FrameEvents::default();
        let addressed = |kind: TransducerType| {
            frame
                .transducers
                .iter()
                .filter_map(|&i| digitizer.transducers.get(i))
                .filter(move |t| t.kind == kind)
        };

        let fingers: Vec<&Transducer> = addressed(TransducerType::Finger).collect();
        if !fingers.is_empty() {
            if digitizer.native {
                self.emit_multitouch(&fingers, &mut out);
            } else {
                emit_single_touch(fingers[0], &mut out);
            }
            if !digitizer.button_elements.is_empty() {
                out.events.push(key(Key::BTN_LEFT, digitizer.buttons.is_set(BUTTON_PRIMARY)));
            }
        }

        for stylus in addressed(TransducerType::Stylus) {
            emit_stylus(stylus, &mut out);
        }
        for puck in addressed(TransducerType::Puck) {
            emit_puck(puck, &mut out);
        }
        out
    }

    fn emit_multitouch(&mut self, fingers: &[&Transducer], out: &mut FrameEvents) {
        let mut pointer = None;
        let mut down = 0;

        for finger in fingers {
            let slot = finger.slot;
            if slot >= MT_SLOTS {
                log::debug!("Finger {} has no slot, dropping", finger.id);
                continue;
            }
            let mut events: Vec<InputEvent> = Vec::new();

            if finger.is_down() {
                down += 1;
                let tracking = match self.tracking[slot] {
                    Some(tracking) if tracking.stroke == finger.stroke => tracking,
                    _ => {
                        self.next_tracking_id = self.next_tracking_id.wrapping_add(1).max(0);
                        let tracking = Tracking {
                            id: self.next_tracking_id,
                            stroke: finger.stroke,
                        };
                        self.tracking[slot] = Some(tracking);
                        events.push(AbsEvent::new(Abs::MT_TRACKING_ID, tracking.id).into());
                        tracking
                    }
                };
                log::trace!("Slot {} tracking {} at {},{}", slot, tracking.id, finger.x.value, finger.y.value);

                events.push(AbsEvent::new(Abs::MT_POSITION_X, finger.x.value).into());
                events.push(AbsEvent::new(Abs::MT_POSITION_Y, finger.y.value).into());
                if finger.elements.tip_pressure.is_some() {
                    let pressure = scale(finger.tip_pressure.value, MT_PRESSURE_MAX);
                    events.push(AbsEvent::new(Abs::MT_PRESSURE, pressure).into());
                }
                if finger.elements.width.is_some() {
                    events.push(AbsEvent::new(Abs::MT_TOUCH_MAJOR, finger.width.value.round() as i32).into());
                }
                pointer.get_or_insert((finger.x.value, finger.y.value));
            } else if self.tracking[slot].take().is_some() {
                events.push(AbsEvent::new(Abs::MT_TRACKING_ID, -1).into());
            }

            if !events.is_empty() {
                out.slots.push((slot as u16, events));
            }
        }

        if let Some((x, y)) = pointer {
            out.events.push(AbsEvent::new(Abs::X, x).into());
            out.events.push(AbsEvent::new(Abs::Y, y).into());
        }
        out.events.extend(build_tool_key_events(down));
    }
}

fn emit_single_touch(finger: &Transducer, out: &mut FrameEvents) {
    let down = finger.is_down();
    if down {
        out.events.push(AbsEvent::new(Abs::X, finger.x.value).into());
        out.events.push(AbsEvent::new(Abs::Y, finger.y.value).into());
    }
    out.events.push(key(Key::BTN_TOUCH, down));
    out.events.push(key(Key::BTN_TOOL_FINGER, down));
}

fn emit_stylus(stylus: &Transducer, out: &mut FrameEvents) {
    let in_range = stylus.range.value && stylus.is_valid;
    if in_range {
        out.events.push(AbsEvent::new(Abs::X, stylus.x.value).into());
        out.events.push(AbsEvent::new(Abs::Y, stylus.y.value).into());
        if stylus.elements.tip_pressure.is_some() {
            let pressure = if stylus.touch.value { scale(stylus.tip_pressure.value, PRESSURE_MAX) } else { 0 };
            out.events.push(AbsEvent::new(Abs::PRESSURE, pressure).into());
        }
        if stylus.elements.tilt_x.is_some() {
            out.events.push(AbsEvent::new(Abs::TILT_X, stylus.tilt_x.value.round() as i32).into());
        }
        if stylus.elements.tilt_y.is_some() {
            out.events.push(AbsEvent::new(Abs::TILT_Y, stylus.tilt_y.value.round() as i32).into());
        }
    }

    let eraser = stylus.inverted;
    out.events.push(key(Key::BTN_TOOL_PEN, in_range && !eraser));
    out.events.push(key(Key::BTN_TOOL_RUBBER, in_range && eraser));
    out.events.push(key(Key::BTN_TOUCH, in_range && stylus.touch.value));
    out.events.push(key(Key::BTN_STYLUS, in_range && stylus.buttons.is_set(BUTTON_BARREL)));
    out.events.push(key(Key::BTN_STYLUS2, in_range && stylus.buttons.is_set(BUTTON_ERASER)));
}

fn emit_puck(puck: &Transducer, out: &mut FrameEvents) {
    let in_range = puck.range.value && puck.is_valid;
    if in_range {
        out.events.push(AbsEvent::new(Abs::X, puck.x.value).into());
        out.events.push(AbsEvent::new(Abs::Y, puck.y.value).into());
    }
    let primary = puck.touch.value || puck.buttons.is_set(BUTTON_PRIMARY);
    out.events.push(key(Key::BTN_TOOL_MOUSE, in_range));
    out.events.push(key(Key::BTN_LEFT, in_range && primary));
    out.events.push(key(Key::BTN_RIGHT, in_range && puck.buttons.is_set(BUTTON_BARREL)));
    out.events.push(key(Key::BTN_MIDDLE, in_range && puck.buttons.is_set(BUTTON_TERTIARY)));
}

fn build_tool_key_events(contact_count: usize) -> Vec<InputEvent> {
    let tool_key = match contact_count {
        0 => None,
        1 => Some(Key::BTN_TOOL_FINGER),
        2 => Some(Key::BTN_TOOL_DOUBLETAP),
        3 => Some(Key::BTN_TOOL_TRIPLETAP),
        _ => Some(Key::BTN_TOOL_QUADTAP),
    };

    let mut events = vec![key(Key::BTN_TOUCH, contact_count > 0)];
    for tool in [
        Key::BTN_TOOL_FINGER,
        Key::BTN_TOOL_DOUBLETAP,
        Key::BTN_TOOL_TRIPLETAP,
        Key::BTN_TOOL_QUADTAP,
    ] {
        events.push(key(tool, Some(tool) == tool_key));
    }
    events
}

fn key(key: Key, pressed: bool) -> InputEvent {
    KeyEvent::new(key, if pressed { KeyState::PRESSED } else { KeyState::RELEASED }).into()
}

/// Map a calibrated 0..1 value onto 0..max.
fn scale(value: f32, max: i32) -> i32 {
    (value.clamp(0.0, 1.0) * max as f32).round() as i32
}
