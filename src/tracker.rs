//! Contact tracking: turn freshly decoded element values into transducer
//! state, one report at a time.

use crate::digitizer::DigitizerSummary;
use crate::element::{Element, ElementDirectory, ElementId, Timestamp};
use crate::transducer::{set_button_state, Transducer};

/// The transducers addressed by one report, handed to the interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub report_id: u8,
    pub timestamp: Timestamp,
    /// Indices into the transducer table, in slot order.
    pub transducers: Vec<usize>,
    /// Live contact count, when the report carries one.
    pub contact_count: Option<usize>,
}

/// Values read for one transducer from a single report. `None` means the
/// element was not refreshed by this report.
#[derive(Debug, Default)]
struct Sample {
    x: Option<i32>,
    y: Option<i32>,
    tip_pressure: Option<f32>,
    barrel_pressure: Option<f32>,
    tilt_x: Option<f32>,
    tilt_y: Option<f32>,
    twist: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
    tip: Option<bool>,
    in_range: Option<bool>,
    confidence: Option<bool>,
    identifier: Option<i32>,
    invert: Option<bool>,
    buttons: Vec<(u32, bool)>,
}

impl Sample {
    fn read(transducer: &Transducer, elements: &ElementDirectory, report_id: u8) -> Self {
        let bound = &transducer.elements;
        let get = |id| fresh(elements, id, report_id);
        let flag = |id| get(id).map(|e| e.value() != 0);

        Self {
            x: get(bound.x).map(Element::value),
            y: get(bound.y).map(Element::value),
            tip_pressure: get(bound.tip_pressure).map(Element::calibrated_value),
            barrel_pressure: get(bound.barrel_pressure).map(Element::calibrated_value),
            tilt_x: get(bound.tilt_x).map(Element::physical_value),
            tilt_y: get(bound.tilt_y).map(Element::physical_value),
            twist: get(bound.twist).map(Element::physical_value),
            width: get(bound.width).map(Element::physical_value),
            height: get(bound.height).map(Element::physical_value),
            tip: flag(bound.tip_switch),
            in_range: flag(bound.in_range),
            confidence: flag(bound.confidence),
            identifier: get(bound.identifier).map(Element::value),
            invert: flag(bound.invert),
            buttons: bound
                .buttons
                .iter()
                .filter_map(|&(id, bit)| get(Some(id)).map(|e| (bit, e.value() != 0)))
                .collect(),
        }
    }

    fn is_empty(&self) -> bool {
        self.x.is_none()
            && self.y.is_none()
            && self.tip_pressure.is_none()
            && self.barrel_pressure.is_none()
            && self.tilt_x.is_none()
            && self.tilt_y.is_none()
            && self.twist.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.tip.is_none()
            && self.in_range.is_none()
            && self.confidence.is_none()
            && self.identifier.is_none()
            && self.invert.is_none()
            && self.buttons.is_empty()
    }
}

/// The element behind `id` if the report being handled refreshed it.
fn fresh(elements: &ElementDirectory, id: Option<ElementId>, report_id: u8) -> Option<&Element> {
    id.and_then(|id| elements.refreshed(id)).filter(|e| e.report_id() == report_id)
}

/// Update every transducer addressed by `report_id`.
///
/// Returns `None` when the report addresses no transducer. Transducers fed
/// by other reports are left untouched.
pub fn handle_digitizer_report(
    digitizer: &mut DigitizerSummary,
    elements: &ElementDirectory,
    timestamp: Timestamp,
    report_id: u8,
) -> Option<Frame> {
    let addressed = digitizer.transducers_for_report(report_id);

    for (id, bit) in digitizer.button_elements.clone() {
        if let Some(element) = fresh(elements, Some(id), report_id) {
            digitizer.buttons = set_button_state(digitizer.buttons, bit, element.value() != 0, timestamp);
        }
    }

    if addressed.is_empty() {
        return None;
    }

    let contact_count = fresh(elements, digitizer.contact_count_element, report_id).map(|e| {
        let live = e.value().max(0) as usize;
        if live > addressed.len() {
            log::debug!("Contact count {} exceeds {} report slots, clamping", live, addressed.len());
        }
        live.min(addressed.len())
    });

    for (slot, &index) in addressed.iter().enumerate() {
        let transducer = &mut digitizer.transducers[index];
        if contact_count.is_some_and(|live| slot >= live) {
            release_stale_slot(transducer, timestamp);
            continue;
        }
        handle_digitizer_transducer_report(transducer, elements, timestamp, report_id);
    }

    Some(Frame {
        report_id,
        timestamp,
        transducers: addressed,
        contact_count,
    })
}

/// Slots past the live contact count hold leftovers from earlier contacts.
fn release_stale_slot(transducer: &mut Transducer, timestamp: Timestamp) {
    transducer.is_valid = false;
    transducer.set_contact(false, false, timestamp);
}

/// Re-read the elements bound to `transducer` and apply them.
///
/// Returns false when the report refreshed none of them, in which case the
/// transducer is unchanged.
pub fn handle_digitizer_transducer_report(
    transducer: &mut Transducer,
    elements: &ElementDirectory,
    timestamp: Timestamp,
    report_id: u8,
) -> bool {
    let sample = Sample::read(transducer, elements, report_id);
    if sample.is_empty() {
        return false;
    }

    if let Some(confidence) = sample.confidence {
        transducer.confidence = confidence;
    }
    transducer.is_valid = transducer.confidence;

    let range = if transducer.range_from_touch {
        sample.tip.unwrap_or(transducer.range.value)
    } else {
        sample.in_range.unwrap_or(transducer.range.value)
    };
    let tip = sample.tip.unwrap_or(transducer.touch.value);

    let mut restart = false;
    if let Some(identifier) = sample.identifier {
        let continuing = transducer.touch.value && tip && range;
        if continuing && transducer.contact_id.is_some_and(|previous| previous != identifier) {
            log::debug!(
                "Transducer {} changed contact {:?} -> {} mid-stroke, restarting stroke",
                transducer.id,
                transducer.contact_id,
                identifier
            );
            restart = true;
        }
        transducer.contact_id = Some(identifier);
    }

    if transducer.is_valid {
        if let Some(x) = sample.x {
            transducer.x.update(x, timestamp);
        }
        if let Some(y) = sample.y {
            transducer.y.update(y, timestamp);
        }
        let axes = [
            (&mut transducer.tip_pressure, sample.tip_pressure),
            (&mut transducer.barrel_pressure, sample.barrel_pressure),
            (&mut transducer.tilt_x, sample.tilt_x),
            (&mut transducer.tilt_y, sample.tilt_y),
            (&mut transducer.twist, sample.twist),
            (&mut transducer.width, sample.width),
            (&mut transducer.height, sample.height),
        ];
        for (axis, value) in axes {
            if let Some(value) = value {
                axis.update(value, timestamp);
            }
        }
    }

    if restart {
        transducer.restart_stroke(timestamp);
    }
    if sample.tip.is_some() || sample.in_range.is_some() {
        transducer.set_contact(range, tip, timestamp);
    }

    if let Some(invert) = sample.invert {
        transducer.inverted = invert;
    }
    for (bit, value) in sample.buttons {
        transducer.buttons = set_button_state(transducer.buttons, bit, value, timestamp);
    }

    transducer.timestamp = timestamp;
    true
}
