//! Multitouch interface of the binary: print decoded events and optionally
//! forward them to a uinput device.

use evdevil::event::{Abs, Key};
use evdevil::uinput::{AbsSetup, UinputDevice};
use evdevil::{AbsInfo, InputProp, Slot};

use mt_hid::digitizer::{DigitizerProperties, DigitizerSummary};
use mt_hid::driver::MultitouchInterface;
use mt_hid::emit::{EventEmitter, FrameEvents, EV_ABS, EV_KEY, EV_SYN, MT_PRESSURE_MAX, MT_SLOTS, PRESSURE_MAX};
use mt_hid::error::DigitizerError;
use mt_hid::tracker::Frame;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct EvdevInterface {
    emitter: EventEmitter,
    device_name: String,
    use_uinput: bool,
    print: bool,
    device: Option<UinputDevice>,
    frames: u64,
    events: u64,
}

impl EvdevInterface {
    pub fn new(device_name: String, use_uinput: bool, print: bool) -> Self {
        Self {
            emitter: EventEmitter::new(),
            device_name,
            use_uinput,
            print,
            device: None,
            frames: 0,
            events: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn events(&self) -> u64 {
        self.events
    }
}

impl MultitouchInterface for EvdevInterface {
    fn publish(&mut self, properties: &DigitizerProperties) -> Result<(), DigitizerError> {
        log::info!("Publishing digitizer:\n{}", properties);
        if !self.use_uinput {
            return Ok(());
        }
        let device = create_device(properties, &self.device_name).map_err(|e| DigitizerError::Publish(e.to_string()))?;
        if let Ok(name) = device.sysname() {
            log::info!("uinput device ready: /sys/devices/virtual/input/{}", name.to_string_lossy());
        }
        self.device = Some(device);
        Ok(())
    }

    fn handle_frame(&mut self, digitizer: &DigitizerSummary, frame: &Frame) {
        let events = self.emitter.frame_events(digitizer, frame);
        if events.is_empty() {
            return;
        }

        let flat = events.flatten();
        if self.print {
            println!("-- {:>12} us  report {}", frame.timestamp / 1_000, frame.report_id);
            for ev in &flat {
                let ty = ev.event_type().raw();
                if ty == EV_SYN {
                    continue;
                }
                println!("   {}  value={}", code_name(ty, ev.raw_code()), ev.raw_value());
            }
        }

        if let Some(device) = &self.device {
            if let Err(e) = write_frame(device, &events) {
                log::warn!("Failed to write frame to uinput: {}", e);
            }
        }

        if self.frames == 0 {
            log::info!("Events flowing");
        }
        self.frames += 1;
        self.events += flat.len() as u64;
        if self.frames.is_multiple_of(500) {
            log::debug!("Frames emitted: {}", self.frames);
        }
    }

    fn unpublish(&mut self) {
        if self.device.take().is_some() {
            log::info!("uinput device removed");
        }
    }
}

fn create_device(properties: &DigitizerProperties, name: &str) -> Result<UinputDevice, BoxError> {
    let x_max = properties.x_max.max(1);
    let y_max = properties.y_max.max(1);
    let mut axes = vec![
        AbsSetup::new(Abs::X, AbsInfo::new(0, x_max)),
        AbsSetup::new(Abs::Y, AbsInfo::new(0, y_max)),
    ];
    let mut keys = vec![Key::BTN_TOUCH];
    let mut push_keys = |new: &[Key]| {
        for key in new {
            if !keys.contains(key) {
                keys.push(*key);
            }
        }
    };

    if properties.finger_count > 0 {
        push_keys(&[Key::BTN_TOOL_FINGER]);
        if properties.native {
            let slots = properties.max_contacts.clamp(1, MT_SLOTS);
            axes.extend([
                AbsSetup::new(Abs::MT_SLOT, AbsInfo::new(0, slots as i32 - 1)),
                AbsSetup::new(Abs::MT_TRACKING_ID, AbsInfo::new(-1, i32::MAX)),
                AbsSetup::new(Abs::MT_POSITION_X, AbsInfo::new(0, x_max)),
                AbsSetup::new(Abs::MT_POSITION_Y, AbsInfo::new(0, y_max)),
                AbsSetup::new(Abs::MT_TOUCH_MAJOR, AbsInfo::new(0, x_max)),
                AbsSetup::new(Abs::MT_PRESSURE, AbsInfo::new(0, MT_PRESSURE_MAX)),
            ]);
            push_keys(&[Key::BTN_TOOL_DOUBLETAP, Key::BTN_TOOL_TRIPLETAP, Key::BTN_TOOL_QUADTAP]);
        }
        if properties.has_buttons {
            push_keys(&[Key::BTN_LEFT]);
        }
    }

    if properties.stylus_count > 0 {
        let (tilt_min, tilt_max) = properties.tilt_range;
        axes.push(AbsSetup::new(Abs::PRESSURE, AbsInfo::new(0, PRESSURE_MAX)));
        if properties.has_tilt {
            axes.push(AbsSetup::new(Abs::TILT_X, AbsInfo::new(tilt_min, tilt_max)));
            axes.push(AbsSetup::new(Abs::TILT_Y, AbsInfo::new(tilt_min, tilt_max)));
        }
        push_keys(&[Key::BTN_TOOL_PEN, Key::BTN_TOOL_RUBBER, Key::BTN_STYLUS, Key::BTN_STYLUS2]);
    }

    if properties.puck_count > 0 {
        push_keys(&[Key::BTN_TOOL_MOUSE, Key::BTN_LEFT, Key::BTN_RIGHT, Key::BTN_MIDDLE]);
    }

    // A touch pad moves a cursor; everything else maps onto the screen.
    let props = if properties.touch_pad {
        vec![InputProp::POINTER, InputProp::BUTTONPAD]
    } else {
        vec![InputProp::DIRECT]
    };

    let device = UinputDevice::builder()?
        .with_props(props)?
        .with_abs_axes(axes)?
        .with_keys(keys)?
        .build(name)?;
    Ok(device)
}

fn write_frame(device: &UinputDevice, frame: &FrameEvents) -> Result<(), BoxError> {
    let mut writer = device.writer();
    for (slot, events) in &frame.slots {
        let slot_writer = writer.slot(Slot::from(*slot))?;
        writer = slot_writer.write(events)?.finish_slot()?;
    }
    writer = writer.write(&frame.events)?;
    writer.finish()?;
    Ok(())
}

fn code_name(ty: u16, code: u16) -> String {
    if ty == EV_KEY {
        let key = match code {
            c if c == Key::BTN_LEFT.raw() => "BTN_LEFT",
            c if c == Key::BTN_RIGHT.raw() => "BTN_RIGHT",
            c if c == Key::BTN_MIDDLE.raw() => "BTN_MIDDLE",
            c if c == Key::BTN_TOUCH.raw() => "BTN_TOUCH",
            c if c == Key::BTN_STYLUS.raw() => "BTN_STYLUS",
            c if c == Key::BTN_STYLUS2.raw() => "BTN_STYLUS2",
            c if c == Key::BTN_TOOL_PEN.raw() => "BTN_TOOL_PEN",
            c if c == Key::BTN_TOOL_RUBBER.raw() => "BTN_TOOL_RUBBER",
            c if c == Key::BTN_TOOL_MOUSE.raw() => "BTN_TOOL_MOUSE",
            c if c == Key::BTN_TOOL_FINGER.raw() => "BTN_TOOL_FINGER",
            c if c == Key::BTN_TOOL_DOUBLETAP.raw() => "BTN_TOOL_DOUBLETAP",
            c if c == Key::BTN_TOOL_TRIPLETAP.raw() => "BTN_TOOL_TRIPLETAP",
            c if c == Key::BTN_TOOL_QUADTAP.raw() => "BTN_TOOL_QUADTAP",
            _ => return format!("KEY/{}", code),
        };
        return key.into();
    }
    if ty == EV_ABS {
        let abs = match code {
            0x00 => "X",
            0x01 => "Y",
            0x18 => "PRESSURE",
            0x1a => "TILT_X",
            0x1b => "TILT_Y",
            0x2f => "MT_SLOT",
            0x30 => "MT_TOUCH_MAJOR",
            0x35 => "MT_POSITION_X",
            0x36 => "MT_POSITION_Y",
            0x39 => "MT_TRACKING_ID",
            0x3a => "MT_PRESSURE",
            _ => "?",
        };
        return format!("ABS_{}({})", abs, code);
    }
    format!("type{} code{}", ty, code)
}
