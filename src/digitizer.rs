//! Descriptor parsing: discover digitizer capabilities in the element tree
//! and bind them to transducers.

use std::fmt;

use crate::calibration::calibrate;
use crate::element::{ElementDirectory, ElementId, ElementKind};
use crate::error::DigitizerError;
use crate::transducer::{
    ButtonState, Transducer, TransducerType, BUTTON_BARREL, BUTTON_ERASER, BUTTON_SECONDARY_TIP,
};
use crate::usage::*;

/// Read-only facts about a parsed digitizer, published to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigitizerProperties {
    pub native: bool,
    pub touch_pad: bool,
    pub transducer_count: usize,
    pub max_contacts: usize,
    pub finger_count: usize,
    pub stylus_count: usize,
    pub puck_count: usize,
    pub has_contact_count: bool,
    pub has_input_mode: bool,
    pub has_pressure: bool,
    pub has_tilt: bool,
    pub has_buttons: bool,
    pub x_max: i32,
    pub y_max: i32,
    pub tilt_range: (i32, i32),
}

impl fmt::Display for DigitizerProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "native multitouch: {}", self.native)?;
        writeln!(f, "touch pad:         {}", self.touch_pad)?;
        writeln!(f, "transducers:       {} ({} finger, {} stylus, {} puck)",
            self.transducer_count, self.finger_count, self.stylus_count, self.puck_count)?;
        writeln!(f, "max contacts:      {}", self.max_contacts)?;
        writeln!(f, "contact count:     {}", self.has_contact_count)?;
        writeln!(f, "input mode:        {}", self.has_input_mode)?;
        writeln!(f, "pressure:          {}", self.has_pressure)?;
        writeln!(f, "tilt:              {}", self.has_tilt)?;
        writeln!(f, "buttons:           {}", self.has_buttons)?;
        write!(f, "logical size:      {}x{}", self.x_max, self.y_max)
    }
}

/// Everything the tracker needs to know about one digitizer device.
#[derive(Debug, Clone, Default)]
pub struct DigitizerSummary {
    pub native: bool,
    /// Discovery order. Fingers carry their contact slot in `slot`.
    pub transducers: Vec<Transducer>,
    pub contact_count_element: Option<ElementId>,
    pub contact_count_max_element: Option<ElementId>,
    pub input_mode_element: Option<ElementId>,
    pub contact_count_max: Option<usize>,
    /// Buttons that belong to the device rather than to a contact,
    /// e.g. the click button of a precision touchpad.
    pub button_elements: Vec<(ElementId, u32)>,
    pub buttons: ButtonState,
    pub properties: DigitizerProperties,
    removal_percentage: u8,
}

/// Walk `directory` once and build the digitizer summary.
///
/// Pressure and tilt elements are calibrated in place with
/// `removal_percentage`. Returns [`DigitizerError::NotFound`] when the
/// descriptor holds no usable digitizer.
pub fn parse_elements(
    directory: &mut ElementDirectory,
    removal_percentage: u8,
) -> Result<DigitizerSummary, DigitizerError> {
    DigitizerSummary::parse_elements(directory, removal_percentage)
}

impl DigitizerSummary {
    pub fn parse_elements(
        directory: &mut ElementDirectory,
        removal_percentage: u8,
    ) -> Result<Self, DigitizerError> {
        if !directory.is_attached() {
            return Err(DigitizerError::NoDevice);
        }

        let mut summary = Self {
            removal_percentage,
            ..Self::default()
        };
        let mut digitizers = 0;

        for index in 0..directory.len() {
            let id = ElementId(index);
            let Some(element) = directory.get(id) else {
                continue;
            };
            if element.usage_page() != PAGE_DIGITIZER {
                continue;
            }

            if element.is_collection() {
                if !is_digitizer_application(element.usage()) || nested_in_digitizer(directory, id) {
                    continue;
                }
                digitizers += 1;
                match summary.parse_digitizer_element(directory, id) {
                    Ok(()) => {}
                    Err(DigitizerError::NotFound) => {
                        log::debug!("Digitizer collection {} has no supported transducer fields", id);
                    }
                    Err(e) => log::warn!("Skipping digitizer collection {}: {}", id, e),
                }
                continue;
            }

            let slot = match element.usage() {
                DIG_CONTACT_COUNT => &mut summary.contact_count_element,
                DIG_CONTACT_COUNT_MAXIMUM => &mut summary.contact_count_max_element,
                DIG_DEVICE_MODE => &mut summary.input_mode_element,
                _ => continue,
            };
            if let Some(existing) = *slot {
                log::warn!(
                    "Ignoring duplicate device control {:#04x} at {} (already bound to {})",
                    element.usage(),
                    id,
                    existing
                );
            } else {
                *slot = Some(id);
            }
        }

        if digitizers == 0 {
            return Err(DigitizerError::NotFound);
        }

        summary.process_digitizer_elements(directory);
        if summary.transducers.is_empty() {
            return Err(DigitizerError::NotFound);
        }
        summary.set_digitizer_properties(directory);
        Ok(summary)
    }

    /// Bind every transducer field found below the digitizer `collection`.
    ///
    /// Returns [`DigitizerError::NotFound`] if the collection holds no
    /// recognized digitizer field at all.
    pub fn parse_digitizer_element(
        &mut self,
        directory: &mut ElementDirectory,
        collection: ElementId,
    ) -> Result<(), DigitizerError> {
        let first_new = self.transducers.len();
        let has_transducer_collections = directory.descendants(collection).into_iter().any(|id| {
            directory
                .get(id)
                .is_some_and(|e| e.is_collection() && e.usage_page() == PAGE_DIGITIZER && is_transducer_collection(e.usage()))
        });
        let mut handled = 0;

        for field in directory.descendants(collection) {
            let Some(element) = directory.get(field) else {
                continue;
            };
            if element.kind() != ElementKind::Input || !is_transducer_field(element.usage_page(), element.usage()) {
                continue;
            }

            let owner = transducer_owner(directory, field, collection);
            if owner == collection && has_transducer_collections {
                if element.usage_page() == PAGE_BUTTON && element.usage() > 0 {
                    self.button_elements.push((field, element.usage() as u32 - 1));
                    handled += 1;
                } else {
                    log::debug!("Ignoring field {:#04x}/{:#04x} outside any transducer collection",
                        element.usage_page(), element.usage());
                }
                continue;
            }

            match self.parse_digitizer_transducer_element(directory, field, owner) {
                Ok(()) => handled += 1,
                Err(e) => log::warn!("Skipping element {}: {}", field, e),
            }
        }

        let mut index = first_new;
        while index < self.transducers.len() {
            match validate_transducer(&self.transducers[index]) {
                Ok(()) => index += 1,
                Err(e) => {
                    log::warn!("Dropping transducer from collection {}: {}", self.transducers[index].collection, e);
                    self.transducers.remove(index);
                }
            }
        }

        if handled == 0 {
            return Err(DigitizerError::NotFound);
        }
        Ok(())
    }

    /// Bind one field to the transducer owned by `parent`, creating the
    /// transducer on first sight. Transducers are keyed by owning collection
    /// and report ID.
    pub fn parse_digitizer_transducer_element(
        &mut self,
        directory: &mut ElementDirectory,
        field: ElementId,
        parent: ElementId,
    ) -> Result<(), DigitizerError> {
        if !directory.is_attached() {
            return Err(DigitizerError::NoDevice);
        }
        let element = directory
            .get(field)
            .ok_or_else(|| DigitizerError::Other(format!("element {} is not in the directory", field)))?;
        let owner = directory
            .get(parent)
            .ok_or_else(|| DigitizerError::Other(format!("collection {} is not in the directory", parent)))?;

        let (page, usage, report_id) = (element.usage_page(), element.usage(), element.report_id());
        let logical_max = element.logical_max();
        let kind = transducer_type(owner.usage());

        // A new transducer joins the table only once its first field binds.
        let next_id = self.transducers.len();
        let mut created = None;
        let transducer = match self
            .transducers
            .iter()
            .position(|t| t.collection == parent && t.report_id == report_id)
        {
            Some(index) => &mut self.transducers[index],
            None => created.insert(Transducer::new(next_id, kind, parent, report_id)),
        };
        let bound = &mut transducer.elements;

        let mut should_calibrate = false;
        match (page, usage) {
            (PAGE_GENERIC_DESKTOP, GD_X) => {
                bind(&mut bound.x, field, "X")?;
                transducer.logical_max_x = logical_max;
            }
            (PAGE_GENERIC_DESKTOP, GD_Y) => {
                bind(&mut bound.y, field, "Y")?;
                transducer.logical_max_y = logical_max;
            }
            (PAGE_BUTTON, 0) => {
                return Err(DigitizerError::MalformedDescriptor("button usage 0".into()));
            }
            (PAGE_BUTTON, n) => bind_button(&mut bound.buttons, field, n as u32 - 1)?,
            (PAGE_DIGITIZER, DIG_TIP_PRESSURE) => {
                bind(&mut bound.tip_pressure, field, "tip pressure")?;
                should_calibrate = true;
            }
            (PAGE_DIGITIZER, DIG_BARREL_PRESSURE) => {
                bind(&mut bound.barrel_pressure, field, "barrel pressure")?;
                should_calibrate = true;
            }
            (PAGE_DIGITIZER, DIG_X_TILT) => {
                bind(&mut bound.tilt_x, field, "X tilt")?;
                should_calibrate = true;
            }
            (PAGE_DIGITIZER, DIG_Y_TILT) => {
                bind(&mut bound.tilt_y, field, "Y tilt")?;
                should_calibrate = true;
            }
            (PAGE_DIGITIZER, DIG_TWIST) => bind(&mut bound.twist, field, "twist")?,
            (PAGE_DIGITIZER, DIG_WIDTH) => bind(&mut bound.width, field, "width")?,
            (PAGE_DIGITIZER, DIG_HEIGHT) => bind(&mut bound.height, field, "height")?,
            (PAGE_DIGITIZER, DIG_TIP_SWITCH | DIG_TOUCH) => bind(&mut bound.tip_switch, field, "tip switch")?,
            (PAGE_DIGITIZER, DIG_IN_RANGE) => bind(&mut bound.in_range, field, "in range")?,
            (PAGE_DIGITIZER, DIG_CONFIDENCE) => bind(&mut bound.confidence, field, "confidence")?,
            (PAGE_DIGITIZER, DIG_CONTACT_IDENTIFIER | DIG_TRANSDUCER_INDEX) => {
                bind(&mut bound.identifier, field, "identifier")?
            }
            (PAGE_DIGITIZER, DIG_INVERT) => bind(&mut bound.invert, field, "invert")?,
            (PAGE_DIGITIZER, DIG_BARREL_SWITCH) => bind_button(&mut bound.buttons, field, BUTTON_BARREL)?,
            (PAGE_DIGITIZER, DIG_ERASER | DIG_SECONDARY_BARREL_SWITCH) => {
                bind_button(&mut bound.buttons, field, BUTTON_ERASER)?
            }
            (PAGE_DIGITIZER, DIG_SECONDARY_TIP_SWITCH) => {
                bind_button(&mut bound.buttons, field, BUTTON_SECONDARY_TIP)?
            }
            _ => {
                return Err(DigitizerError::Other(format!(
                    "usage {:#04x}/{:#04x} is not a transducer field",
                    page, usage
                )))
            }
        }

        if let Some(transducer) = created {
            log::debug!("Found {} transducer in collection {} (report {})", kind, parent, report_id);
            self.transducers.push(transducer);
        }

        if should_calibrate {
            if let Some(element) = directory.get_mut(field) {
                calibrate(element, self.removal_percentage);
            }
        }
        Ok(())
    }

    /// Clean up after discovery: honor the advertised contact maximum,
    /// derive missing range fields, decide native multitouch and assign
    /// final ids and finger slots.
    pub fn process_digitizer_elements(&mut self, directory: &ElementDirectory) {
        self.contact_count_max = self
            .contact_count_max_element
            .and_then(|id| directory.get(id))
            .map(|e| if e.value() > 0 { e.value() } else { e.logical_max() })
            .filter(|&max| max > 0)
            .map(|max| max as usize);

        if let Some(max) = self.contact_count_max {
            let before = self.transducers.len();
            let mut fingers = 0;
            self.transducers.retain(|t| {
                if t.kind != TransducerType::Finger {
                    return true;
                }
                fingers += 1;
                fingers <= max
            });
            if self.transducers.len() < before {
                log::info!(
                    "Descriptor declares {} finger collections but at most {} contacts, truncating",
                    fingers,
                    max
                );
            }
        }

        for transducer in &mut self.transducers {
            transducer.range_from_touch = transducer.elements.in_range.is_none();
        }

        // TODO: verify the single-collection rule against a wider set of real descriptors.
        self.native = if self.contact_count_element.is_some() {
            true
        } else if self.transducers.len() > 1 {
            true
        } else {
            self.input_mode_element.is_some()
        };

        let mut fingers = 0;
        for (index, transducer) in self.transducers.iter_mut().enumerate() {
            transducer.id = index;
            if transducer.kind == TransducerType::Finger {
                transducer.slot = fingers;
                fingers += 1;
            }
        }
    }

    /// Fill in [`DigitizerProperties`] from the final transducer table.
    pub fn set_digitizer_properties(&mut self, directory: &ElementDirectory) {
        let count = |kind| self.transducers.iter().filter(|t| t.kind == kind).count();
        let finger_count = count(TransducerType::Finger);

        let tilt_range = self
            .transducers
            .iter()
            .find_map(|t| t.elements.tilt_x)
            .and_then(|id| directory.get(id))
            .map(|e| match e.physical_range() {
                (min, max) if min != max => (min, max),
                _ => (e.logical_min(), e.logical_max()),
            })
            .unwrap_or_default();

        let touch_pad = self.transducers.iter().any(|t| {
            std::iter::once(t.collection)
                .chain(directory.ancestors(t.collection))
                .filter_map(|id| directory.get(id))
                .any(|e| e.usage_page() == PAGE_DIGITIZER && e.usage() == DIG_TOUCH_PAD)
        });

        self.properties = DigitizerProperties {
            native: self.native,
            touch_pad,
            transducer_count: self.transducers.len(),
            max_contacts: self.contact_count_max.unwrap_or(finger_count),
            finger_count,
            stylus_count: count(TransducerType::Stylus),
            puck_count: count(TransducerType::Puck),
            has_contact_count: self.contact_count_element.is_some(),
            has_input_mode: self.input_mode_element.is_some(),
            has_pressure: self.transducers.iter().any(|t| t.elements.tip_pressure.is_some()),
            has_tilt: self.transducers.iter().any(|t| t.elements.tilt_x.is_some() || t.elements.tilt_y.is_some()),
            has_buttons: !self.button_elements.is_empty()
                || self.transducers.iter().any(|t| !t.elements.buttons.is_empty()),
            x_max: self.transducers.iter().map(|t| t.logical_max_x).max().unwrap_or(0),
            y_max: self.transducers.iter().map(|t| t.logical_max_y).max().unwrap_or(0),
            tilt_range,
        };

        log::info!(
            "Digitizer: {} transducers ({} finger), max contacts {}, native={}",
            self.properties.transducer_count,
            finger_count,
            self.properties.max_contacts,
            self.native
        );
    }

    /// Indices of the transducers fed by `report_id`, in slot order.
    pub fn transducers_for_report(&self, report_id: u8) -> Vec<usize> {
        self.transducers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.report_id == report_id)
            .map(|(index, _)| index)
            .collect()
    }
}

fn bind(slot: &mut Option<ElementId>, field: ElementId, name: &str) -> Result<(), DigitizerError> {
    if let Some(existing) = slot {
        return Err(DigitizerError::MalformedDescriptor(format!(
            "{} bound twice ({} and {})",
            name, existing, field
        )));
    }
    *slot = Some(field);
    Ok(())
}

fn bind_button(buttons: &mut Vec<(ElementId, u32)>, field: ElementId, bit: u32) -> Result<(), DigitizerError> {
    if let Some((existing, _)) = buttons.iter().find(|(_, b)| *b == bit) {
        return Err(DigitizerError::MalformedDescriptor(format!(
            "button {} bound twice ({} and {})",
            bit, existing, field
        )));
    }
    buttons.push((field, bit));
    Ok(())
}

fn validate_transducer(transducer: &Transducer) -> Result<(), DigitizerError> {
    match (transducer.elements.x, transducer.elements.y) {
        (Some(_), None) => Err(DigitizerError::Device(format!("{} transducer reports X without Y", transducer.kind))),
        (None, Some(_)) => Err(DigitizerError::Device(format!("{} transducer reports Y without X", transducer.kind))),
        _ => Ok(()),
    }
}

fn is_transducer_field(page: u16, usage: u16) -> bool {
    match page {
        PAGE_GENERIC_DESKTOP => matches!(usage, GD_X | GD_Y),
        PAGE_BUTTON => true,
        PAGE_DIGITIZER => matches!(
            usage,
            DIG_TIP_PRESSURE
                | DIG_BARREL_PRESSURE
                | DIG_IN_RANGE
                | DIG_TOUCH
                | DIG_TRANSDUCER_INDEX
                | DIG_INVERT
                | DIG_X_TILT
                | DIG_Y_TILT
                | DIG_TWIST
                | DIG_TIP_SWITCH
                | DIG_SECONDARY_TIP_SWITCH
                | DIG_BARREL_SWITCH
                | DIG_ERASER
                | DIG_CONFIDENCE
                | DIG_WIDTH
                | DIG_HEIGHT
                | DIG_CONTACT_IDENTIFIER
                | DIG_SECONDARY_BARREL_SWITCH
        ),
        _ => false,
    }
}

fn transducer_type(collection_usage: u16) -> TransducerType {
    match collection_usage {
        DIG_FINGER | DIG_TOUCH_SCREEN | DIG_TOUCH_PAD | DIG_MULTIPLE_POINT_DIGITIZER => TransducerType::Finger,
        DIG_PUCK => TransducerType::Puck,
        _ => TransducerType::Stylus,
    }
}

/// Nearest enclosing transducer or digitizer collection of `field`, bounded by `root`.
fn transducer_owner(directory: &ElementDirectory, field: ElementId, root: ElementId) -> ElementId {
    for ancestor in directory.ancestors(field) {
        if ancestor == root {
            break;
        }
        let Some(element) = directory.get(ancestor) else {
            break;
        };
        if element.usage_page() == PAGE_DIGITIZER
            && (is_transducer_collection(element.usage()) || is_digitizer_application(element.usage()))
        {
            return ancestor;
        }
    }
    root
}

fn nested_in_digitizer(directory: &ElementDirectory, id: ElementId) -> bool {
    directory.ancestors(id).any(|ancestor| {
        directory
            .get(ancestor)
            .is_some_and(|e| e.usage_page() == PAGE_DIGITIZER && is_digitizer_application(e.usage()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{CollectionType, Element};
    use crate::testutil::*;

    #[test]
    fn test_single_collection_is_not_native() {
        let mut dir = ElementDirectory::new();
        let app = dir.add(None, Element::collection(CollectionType::Application, PAGE_DIGITIZER, DIG_TOUCH_SCREEN));
        let finger = dir.add(Some(app), Element::collection(CollectionType::Logical, PAGE_DIGITIZER, DIG_FINGER));
        dir.add(Some(finger), Element::input(PAGE_GENERIC_DESKTOP, GD_X).with_report(1, 8, 16).with_logical(0, 4095));
        dir.add(Some(finger), Element::input(PAGE_GENERIC_DESKTOP, GD_Y).with_report(1, 24, 16).with_logical(0, 2047));
        dir.add(Some(finger), Element::input(PAGE_DIGITIZER, DIG_TIP_SWITCH).with_report(1, 0, 1).with_logical(0, 1));
        dir.add(Some(finger), Element::input(PAGE_DIGITIZER, DIG_IN_RANGE).with_report(1, 1, 1).with_logical(0, 1));

        let summary = parse_elements(&mut dir, 15).unwrap();
        assert!(!summary.native);
        assert_eq!(summary.transducers.len(), 1);
        let t = &summary.transducers[0];
        assert_eq!(t.kind, TransducerType::Finger);
        assert_eq!((t.logical_max_x, t.logical_max_y), (4095, 2047));
        assert!(!t.range_from_touch);
    }

    #[test]
    fn test_contact_count_max_truncates_table() {
        let mut dir = touch_screen(3, true, Some(2));
        let summary = parse_elements(&mut dir, 15).unwrap();
        assert_eq!(summary.transducers.len(), 2);
        assert!(summary.native);
        assert_eq!(summary.contact_count_max, Some(2));
        assert_eq!(summary.properties.max_contacts, 2);
        let ids: Vec<usize> = summary.transducers.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_multiple_collections_without_counter_are_native() {
        let mut dir = touch_screen(3, false, None);
        let summary = parse_elements(&mut dir, 15).unwrap();
        assert!(summary.native);
        assert_eq!(summary.transducers.len(), 3);
        assert!(summary.contact_count_element.is_none());
    }

    #[test]
    fn test_no_digitizer_is_not_found() {
        let mut dir = ElementDirectory::new();
        let app = dir.add(None, Element::collection(CollectionType::Application, PAGE_GENERIC_DESKTOP, 0x02));
        dir.add(Some(app), Element::input(PAGE_GENERIC_DESKTOP, GD_X).with_report(0, 0, 8).with_logical(-127, 127));
        assert_eq!(parse_elements(&mut dir, 15).unwrap_err(), DigitizerError::NotFound);
    }

    #[test]
    fn test_detached_directory_is_no_device() {
        let mut dir = touch_screen(1, false, None);
        dir.detach();
        assert_eq!(parse_elements(&mut dir, 15).unwrap_err(), DigitizerError::NoDevice);
    }

    #[test]
    fn test_stylus_fields_are_bound_and_calibrated() {
        let mut dir = pen_digitizer();
        let summary = parse_elements(&mut dir, 20).unwrap();
        assert_eq!(summary.transducers.len(), 1);
        let t = &summary.transducers[0];
        assert_eq!(t.kind, TransducerType::Stylus);
        assert_eq!(t.elements.buttons.len(), 2);
        assert!(t.elements.invert.is_some());

        let pressure = dir.get(t.elements.tip_pressure.unwrap()).unwrap();
        assert_eq!(pressure.raw_logical_range(), (0, 4095));
        assert_eq!((pressure.logical_min(), pressure.logical_max()), (409, 3686));
        assert!(dir.get(t.elements.tilt_x.unwrap()).unwrap().calibration().is_some());
        assert!(dir.get(t.elements.x.unwrap()).unwrap().calibration().is_none());

        assert!(summary.properties.has_pressure);
        assert!(summary.properties.has_tilt);
        assert_eq!(summary.properties.tilt_range, (-6000, 6000));
    }

    #[test]
    fn test_x_without_y_drops_only_that_transducer() {
        let mut dir = ElementDirectory::new();
        let app = dir.add(None, Element::collection(CollectionType::Application, PAGE_DIGITIZER, DIG_TOUCH_SCREEN));
        let broken = dir.add(Some(app), Element::collection(CollectionType::Logical, PAGE_DIGITIZER, DIG_FINGER));
        dir.add(Some(broken), Element::input(PAGE_GENERIC_DESKTOP, GD_X).with_report(1, 0, 16).with_logical(0, 100));
        dir.add(Some(broken), Element::input(PAGE_DIGITIZER, DIG_TIP_SWITCH).with_report(1, 16, 1).with_logical(0, 1));
        add_finger(&mut dir, app, 1, 24);

        let summary = parse_elements(&mut dir, 15).unwrap();
        assert_eq!(summary.transducers.len(), 1);
        assert_ne!(summary.transducers[0].collection, broken);
        assert_eq!(summary.transducers[0].id, 0);
    }

    #[test]
    fn test_duplicate_field_is_skipped() {
        let mut dir = ElementDirectory::new();
        let app = dir.add(None, Element::collection(CollectionType::Application, PAGE_DIGITIZER, DIG_TOUCH_SCREEN));
        let finger = add_finger(&mut dir, app, 1, 0);
        let first_tip = dir.descendants(finger)[0];
        dir.add(Some(finger), Element::input(PAGE_DIGITIZER, DIG_TIP_SWITCH).with_report(1, 60, 1).with_logical(0, 1));

        let summary = parse_elements(&mut dir, 15).unwrap();
        assert_eq!(summary.transducers[0].elements.tip_switch, Some(first_tip));
        assert!(summary.transducers[0].elements.x.is_some());
    }

    #[test]
    fn test_collection_without_bindable_fields_adds_no_transducer() {
        let mut dir = touch_screen(1, true, None);
        let app = ElementId(0);
        let empty = dir.add(Some(app), Element::collection(CollectionType::Logical, PAGE_DIGITIZER, DIG_FINGER));
        dir.add(Some(empty), Element::input(PAGE_BUTTON, 0).with_report(REPORT_TOUCH, 56, 1).with_logical(0, 1));

        let summary = parse_elements(&mut dir, 15).unwrap();
        assert_eq!(summary.transducers.len(), 1);
        assert!(summary.transducers.iter().all(|t| t.collection != empty));
        assert_eq!(summary.properties.finger_count, 1);
    }

    #[test]
    fn test_touchpad_button_binds_to_device() {
        let mut dir = touch_screen_with_button(2);
        let summary = parse_elements(&mut dir, 15).unwrap();
        assert_eq!(summary.transducers.len(), 2);
        assert_eq!(summary.button_elements.len(), 1);
        assert_eq!(summary.button_elements[0].1, 0);
        assert!(summary.properties.touch_pad);
        assert!(summary.properties.has_buttons);
    }

    #[test]
    fn test_input_mode_marks_single_transducer_native() {
        let mut dir = touch_screen(1, false, None);
        let config = dir.add(None, Element::collection(CollectionType::Application, PAGE_DIGITIZER, DIG_DEVICE_CONFIGURATION));
        let mode = dir.add(Some(config), Element::feature(PAGE_DIGITIZER, DIG_DEVICE_MODE).with_report(3, 0, 8).with_logical(0, 10));

        let summary = parse_elements(&mut dir, 15).unwrap();
        assert!(summary.native);
        assert_eq!(summary.input_mode_element, Some(mode));
    }

    #[test]
    fn test_transducers_keyed_by_report_id() {
        let mut dir = ElementDirectory::new();
        let app = dir.add(None, Element::collection(CollectionType::Application, PAGE_DIGITIZER, DIG_PEN));
        let stylus = dir.add(Some(app), Element::collection(CollectionType::Physical, PAGE_DIGITIZER, DIG_STYLUS));
        dir.add(Some(stylus), Element::input(PAGE_GENERIC_DESKTOP, GD_X).with_report(2, 0, 16).with_logical(0, 100));
        dir.add(Some(stylus), Element::input(PAGE_GENERIC_DESKTOP, GD_Y).with_report(2, 16, 16).with_logical(0, 100));
        dir.add(Some(stylus), Element::input(PAGE_DIGITIZER, DIG_BARREL_SWITCH).with_report(7, 0, 1).with_logical(0, 1));

        let summary = parse_elements(&mut dir, 15).unwrap();
        assert_eq!(summary.transducers.len(), 2);
        assert_eq!(summary.transducers_for_report(7), vec![1]);
    }
}
