//! Element directory: the enumerated HID element tree and its cached values.
//!
//! The directory stands in for the HID interface a driver is attached to. It
//! owns every element, refreshes element values when a report arrives and
//! stamps each refreshed element with the report's timestamp and sequence
//! number. The digitizer core never decodes report bytes itself; it only
//! reads elements.

use std::fmt;

/// Report timestamp in nanoseconds.
pub type Timestamp = u64;

/// Index of an element inside its [`ElementDirectory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionType {
    Physical,
    Application,
    Logical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Collection(CollectionType),
    Input,
    Output,
    Feature,
}

/// Location of a field inside a report payload (report ID byte excluded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitField {
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug, Clone)]
pub struct Element {
    kind: ElementKind,
    usage_page: u16,
    usage: u16,
    report_id: u8,
    field: BitField,
    logical_min: i32,
    logical_max: i32,
    physical_min: i32,
    physical_max: i32,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    value: i32,
    timestamp: Timestamp,
    sequence: u64,
    calibration: Option<(i32, i32)>,
}

impl Element {
    fn new(kind: ElementKind, usage_page: u16, usage: u16) -> Self {
        Self {
            kind,
            usage_page,
            usage,
            report_id: 0,
            field: BitField::default(),
            logical_min: 0,
            logical_max: 0,
            physical_min: 0,
            physical_max: 0,
            parent: None,
            children: Vec::new(),
            value: 0,
            timestamp: 0,
            sequence: 0,
            calibration: None,
        }
    }

    pub fn collection(collection: CollectionType, usage_page: u16, usage: u16) -> Self {
        Self::new(ElementKind::Collection(collection), usage_page, usage)
    }

    pub fn input(usage_page: u16, usage: u16) -> Self {
        Self::new(ElementKind::Input, usage_page, usage)
    }

    pub fn feature(usage_page: u16, usage: u16) -> Self {
        Self::new(ElementKind::Feature, usage_page, usage)
    }

    pub fn output(usage_page: u16, usage: u16) -> Self {
        Self::new(ElementKind::Output, usage_page, usage)
    }

    pub fn with_kind(mut self, kind: ElementKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_report(mut self, report_id: u8, offset: u32, size: u32) -> Self {
        self.report_id = report_id;
        self.field = BitField { offset, size };
        self
    }

    pub fn with_logical(mut self, min: i32, max: i32) -> Self {
        self.logical_min = min;
        self.logical_max = max;
        self
    }

    pub fn with_physical(mut self, min: i32, max: i32) -> Self {
        self.physical_min = min;
        self.physical_max = max;
        self
    }

    pub fn with_value(mut self, value: i32) -> Self {
        self.value = value;
        self
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, ElementKind::Collection(_))
    }

    pub fn usage_page(&self) -> u16 {
        self.usage_page
    }

    pub fn usage(&self) -> u16 {
        self.usage
    }

    pub fn report_id(&self) -> u8 {
        self.report_id
    }

    pub fn field(&self) -> BitField {
        self.field
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    /// Timestamp of the report that last refreshed this element.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Sequence number of the report that last refreshed this element, 0 if
    /// none has.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Effective lower bound: the calibrated one when calibrated.
    pub fn logical_min(&self) -> i32 {
        self.calibration.map_or(self.logical_min, |(min, _)| min)
    }

    /// Effective upper bound: the calibrated one when calibrated.
    pub fn logical_max(&self) -> i32 {
        self.calibration.map_or(self.logical_max, |(_, max)| max)
    }

    /// Bounds as declared by the descriptor, ignoring calibration.
    pub fn raw_logical_range(&self) -> (i32, i32) {
        (self.logical_min, self.logical_max)
    }

    pub fn physical_range(&self) -> (i32, i32) {
        (self.physical_min, self.physical_max)
    }

    pub fn calibration(&self) -> Option<(i32, i32)> {
        self.calibration
    }

    pub fn set_calibration(&mut self, min: i32, max: i32) {
        self.calibration = Some((min, max));
    }

    /// Value as a fraction of the effective range, saturating at both ends.
    pub fn calibrated_value(&self) -> f32 {
        let (min, max) = (self.logical_min() as f64, self.logical_max() as f64);
        if max <= min {
            return 0.0;
        }
        (((self.value as f64) - min) / (max - min)).clamp(0.0, 1.0) as f32
    }

    /// Value mapped onto the physical range. Without a physical range the
    /// logical value is returned unchanged.
    pub fn physical_value(&self) -> f32 {
        let (pmin, pmax) = (self.physical_min as f64, self.physical_max as f64);
        let (lmin, lmax) = (self.logical_min() as f64, self.logical_max() as f64);
        if pmin == pmax || lmin >= lmax {
            return self.value as f32;
        }
        let clamped = (self.value as f64).clamp(lmin, lmax);
        (pmin + (clamped - lmin) * (pmax - pmin) / (lmax - lmin)) as f32
    }

    fn decode(&mut self, payload: &[u8], timestamp: Timestamp, sequence: u64) -> bool {
        let Some(raw) = extract_bits(payload, self.field.offset, self.field.size) else {
            return false;
        };
        self.value = if self.logical_min < 0 {
            sign_extend(raw, self.field.size)
        } else {
            raw as i32
        };
        self.timestamp = timestamp;
        self.sequence = sequence;
        true
    }
}

/// Ordered arena of elements in descriptor order.
#[derive(Debug, Clone)]
pub struct ElementDirectory {
    elements: Vec<Element>,
    attached: bool,
    sequence: u64,
}

impl Default for ElementDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementDirectory {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            attached: true,
            sequence: 0,
        }
    }

    /// Append an element under `parent` and return its handle.
    pub fn add(&mut self, parent: Option<ElementId>, mut element: Element) -> ElementId {
        let id = ElementId(self.elements.len());
        element.parent = parent;
        element.children.clear();
        self.elements.push(element);
        if let Some(parent) = parent.and_then(|p| self.elements.get_mut(p.0)) {
            parent.children.push(id);
        }
        id
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        self.elements.iter().enumerate().map(|(i, e)| (ElementId(i), e))
    }

    /// Depth-first descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = match self.get(id) {
            Some(element) => element.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(element) = self.get(next) {
                stack.extend(element.children.iter().rev().copied());
            }
        }
        out
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(self.get(id).and_then(|e| e.parent), move |p| {
            self.get(*p).and_then(|e| e.parent)
        })
    }

    /// True if any element declares a non-zero report ID, in which case
    /// every report buffer starts with its report ID byte.
    pub fn uses_report_ids(&self) -> bool {
        self.elements.iter().any(|e| e.report_id != 0)
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// The element behind `id` if the most recent [`process_report`] call
    /// refreshed it.
    ///
    /// [`process_report`]: Self::process_report
    pub fn refreshed(&self, id: ElementId) -> Option<&Element> {
        self.get(id).filter(|e| self.sequence != 0 && e.sequence == self.sequence)
    }

    /// Mark the directory as no longer backed by a live provider.
    pub fn detach(&mut self) {
        self.attached = false;
    }

    /// Write a value into an output or feature element (e.g. the device mode).
    pub fn set_value(&mut self, id: ElementId, value: i32) -> bool {
        match self.elements.get_mut(id.0) {
            Some(element) if !element.is_collection() => {
                element.value = value;
                true
            }
            _ => false,
        }
    }

    /// Refresh every input element belonging to `report_id` from `report`.
    ///
    /// Returns the number of elements refreshed. Elements whose field lies
    /// outside the buffer keep their previous state.
    pub fn process_report(&mut self, report_id: u8, report: &[u8], timestamp: Timestamp) -> usize {
        self.sequence += 1;
        let sequence = self.sequence;
        let payload = if self.uses_report_ids() {
            match report.split_first() {
                Some((&id, rest)) if id == report_id => rest,
                Some((&id, _)) => {
                    log::debug!("Report ID mismatch: buffer starts with {}, expected {}", id, report_id);
                    return 0;
                }
                None => return 0,
            }
        } else {
            report
        };

        let mut refreshed = 0;
        for element in &mut self.elements {
            if element.kind != ElementKind::Input || element.report_id != report_id {
                continue;
            }
            if element.decode(payload, timestamp, sequence) {
                refreshed += 1;
            }
        }
        refreshed
    }
}

fn extract_bits(data: &[u8], offset: u32, size: u32) -> Option<u32> {
    if size == 0 || size > 32 {
        return None;
    }
    let end = offset as usize + size as usize;
    if end > data.len() * 8 {
        return None;
    }
    let first = offset as usize / 8;
    let last = (end - 1) / 8;
    let mut value: u64 = 0;
    for (i, byte) in data[first..=last].iter().enumerate() {
        value |= (*byte as u64) << (8 * i);
    }
    value >>= offset % 8;
    let mask = if size == 32 { u32::MAX as u64 } else { (1u64 << size) - 1 };
    Some((value & mask) as u32)
}

fn sign_extend(raw: u32, size: u32) -> i32 {
    if size >= 32 {
        return raw as i32;
    }
    let shift = 32 - size;
    ((raw << shift) as i32) >> shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::*;

    #[test]
    fn test_extract_bits_unaligned() {
        // 12-bit field starting at bit 4: 0xABC
        let data = [0xc0, 0xab, 0x00];
        assert_eq!(extract_bits(&data, 4, 12), Some(0xabc));
        assert_eq!(extract_bits(&data, 0, 1), Some(0));
        assert_eq!(extract_bits(&data, 6, 1), Some(1));
        assert_eq!(extract_bits(&data, 16, 16), None);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0xff, 8), -1);
        assert_eq!(sign_extend(0x7f, 8), 127);
        assert_eq!(sign_extend(0x800, 12), -2048);
    }

    #[test]
    fn test_process_report_refreshes_matching_elements() {
        let mut dir = ElementDirectory::new();
        let app = dir.add(None, Element::collection(CollectionType::Application, PAGE_DIGITIZER, DIG_TOUCH_PAD));
        let x = dir.add(
            Some(app),
            Element::input(PAGE_GENERIC_DESKTOP, GD_X).with_report(1, 0, 16).with_logical(0, 4095),
        );
        let other = dir.add(
            Some(app),
            Element::input(PAGE_GENERIC_DESKTOP, GD_Y).with_report(2, 0, 16).with_logical(0, 4095),
        );

        assert_eq!(dir.process_report(1, &[1, 0x34, 0x02], 10), 1);
        assert_eq!(dir.get(x).unwrap().value(), 0x234);
        assert_eq!(dir.get(x).unwrap().timestamp(), 10);
        assert_eq!(dir.get(other).unwrap().timestamp(), 0);

        // Wrong leading ID byte is ignored
        assert_eq!(dir.process_report(1, &[2, 0xff, 0xff], 20), 0);
        assert_eq!(dir.get(x).unwrap().timestamp(), 10);
    }

    #[test]
    fn test_short_report_keeps_previous_value() {
        let mut dir = ElementDirectory::new();
        let x = dir.add(None, Element::input(PAGE_GENERIC_DESKTOP, GD_X).with_report(0, 8, 16).with_logical(0, 100));
        dir.process_report(0, &[0, 50, 0], 5);
        assert_eq!(dir.process_report(0, &[0, 60], 6), 0);
        assert_eq!(dir.get(x).unwrap().value(), 50);
        assert_eq!(dir.get(x).unwrap().timestamp(), 5);
        assert!(dir.refreshed(x).is_none());
    }

    #[test]
    fn test_refreshed_ignores_never_updated_elements_at_time_zero() {
        let mut dir = ElementDirectory::new();
        let x = dir.add(None, Element::input(PAGE_GENERIC_DESKTOP, GD_X).with_report(0, 0, 8).with_logical(0, 100));
        let count = dir.add(None, Element::input(PAGE_DIGITIZER, DIG_CONTACT_COUNT).with_report(0, 8, 8).with_logical(0, 2));
        assert!(dir.refreshed(x).is_none());

        assert_eq!(dir.process_report(0, &[40], 0), 1);
        assert_eq!(dir.refreshed(x).unwrap().value(), 40);
        // Same timestamp as the report, but never decoded
        assert_eq!(dir.get(count).unwrap().timestamp(), 0);
        assert!(dir.refreshed(count).is_none());

        // A later report that misses X makes it stale
        assert_eq!(dir.process_report(0, &[], 0), 0);
        assert!(dir.refreshed(x).is_none());
    }

    #[test]
    fn test_tree_navigation() {
        let mut dir = ElementDirectory::new();
        let app = dir.add(None, Element::collection(CollectionType::Application, PAGE_DIGITIZER, DIG_TOUCH_SCREEN));
        let finger = dir.add(Some(app), Element::collection(CollectionType::Logical, PAGE_DIGITIZER, DIG_FINGER));
        let tip = dir.add(Some(finger), Element::input(PAGE_DIGITIZER, DIG_TIP_SWITCH));
        let count = dir.add(Some(app), Element::input(PAGE_DIGITIZER, DIG_CONTACT_COUNT));

        assert_eq!(dir.descendants(app), vec![finger, tip, count]);
        assert_eq!(dir.ancestors(tip).collect::<Vec<_>>(), vec![finger, app]);
        assert_eq!(dir.get(app).unwrap().children(), &[finger, count]);
    }

    #[test]
    fn test_physical_and_calibrated_values() {
        let mut element = Element::input(PAGE_DIGITIZER, DIG_X_TILT)
            .with_logical(-90, 90)
            .with_physical(-9000, 9000)
            .with_value(45);
        assert_eq!(element.physical_value(), 4500.0);
        assert_eq!(element.calibrated_value(), 0.75);

        element.set_calibration(-45, 45);
        assert_eq!(element.physical_value(), 9000.0);
        assert_eq!(element.calibrated_value(), 1.0);
    }
}
