//! Device instance: setup, report delivery, power and teardown.
//!
//! The driver does not inherit from any host type. Hosts plug in through two
//! traits: [`HidProvider`] supplies the enumerated elements and accepts
//! feature writes, and [`MultitouchInterface`] receives the published
//! properties and every decoded frame.

use crate::calibration::DEFAULT_REMOVAL_PERCENTAGE;
use crate::digitizer::{parse_elements, DigitizerProperties, DigitizerSummary};
use crate::element::{ElementDirectory, ElementId, Timestamp};
use crate::error::DigitizerError;
use crate::tracker::{self, Frame};
use crate::usage::DEVICE_MODE_MULTI_INPUT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    Input,
    Output,
    Feature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Off,
    On,
}

/// The power transition completed synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerAck;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Completed,
    /// A report is being handled; teardown finishes when it returns.
    Deferred,
}

/// Source of elements and sink for feature writes.
pub trait HidProvider {
    fn name(&self) -> &str;

    /// Enumerate the device's elements.
    fn elements(&mut self) -> Result<ElementDirectory, DigitizerError>;

    /// Send a new value for an output or feature element to the device.
    fn set_element_value(&mut self, element: ElementId, value: i32) -> Result<(), DigitizerError>;

    fn close(&mut self) {}
}

/// Host-side registration point and consumer of decoded frames.
pub trait MultitouchInterface {
    fn publish(&mut self, properties: &DigitizerProperties) -> Result<(), DigitizerError>;

    fn handle_frame(&mut self, digitizer: &DigitizerSummary, frame: &Frame);

    fn unpublish(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Inactive,
    Active,
    TeardownPending,
    Terminated,
}

/// Tracks whether reports may be handled and whether teardown has to wait
/// for one in flight.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: LifecycleState,
    in_flight: bool,
}

impl Lifecycle {
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn activate(&mut self) -> bool {
        if self.state != LifecycleState::Inactive {
            return false;
        }
        self.state = LifecycleState::Active;
        true
    }

    /// Returns false if the report must be dropped.
    pub fn begin_report(&mut self) -> bool {
        if self.state != LifecycleState::Active || self.in_flight {
            return false;
        }
        self.in_flight = true;
        true
    }

    /// Returns true if a deferred teardown has to be completed now.
    pub fn end_report(&mut self) -> bool {
        self.in_flight = false;
        if self.state == LifecycleState::TeardownPending {
            self.state = LifecycleState::Terminated;
            return true;
        }
        false
    }

    pub fn request_teardown(&mut self) -> Termination {
        match self.state {
            LifecycleState::Terminated => Termination::Completed,
            _ if self.in_flight => {
                self.state = LifecycleState::TeardownPending;
                Termination::Deferred
            }
            _ => {
                self.state = LifecycleState::Terminated;
                Termination::Completed
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DriverSettings {
    pub removal_percentage: u8,
    /// Value written to the device mode feature on start and wake.
    pub input_mode: i32,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            removal_percentage: DEFAULT_REMOVAL_PERCENTAGE,
            input_mode: DEVICE_MODE_MULTI_INPUT,
        }
    }
}

pub struct Driver<P: HidProvider, I: MultitouchInterface> {
    settings: DriverSettings,
    provider: Option<P>,
    interface: I,
    elements: ElementDirectory,
    digitizer: Option<DigitizerSummary>,
    lifecycle: Lifecycle,
    awake: bool,
    published: bool,
    reports: u64,
}

impl<P: HidProvider, I: MultitouchInterface> Driver<P, I> {
    pub fn new(interface: I, settings: DriverSettings) -> Self {
        Self {
            settings,
            provider: None,
            interface,
            elements: ElementDirectory::new(),
            digitizer: None,
            lifecycle: Lifecycle::default(),
            awake: true,
            published: false,
            reports: 0,
        }
    }

    /// Parse the provider's descriptor and publish the multitouch interface.
    ///
    /// Either both steps succeed and the driver becomes active, or the
    /// provider is closed and nothing stays published.
    pub fn handle_start(&mut self, mut provider: P) -> Result<(), DigitizerError> {
        if self.lifecycle.state() != LifecycleState::Inactive {
            return Err(DigitizerError::Other("driver was already started".into()));
        }
        log::info!("Starting digitizer driver for {}", provider.name());

        let mut elements = match provider.elements() {
            Ok(elements) => elements,
            Err(e) => {
                provider.close();
                return Err(e);
            }
        };
        let digitizer = match parse_elements(&mut elements, self.settings.removal_percentage) {
            Ok(digitizer) => digitizer,
            Err(e) => {
                log::warn!("{} is not a supported digitizer: {}", provider.name(), e);
                provider.close();
                return Err(e);
            }
        };

        self.elements = elements;
        self.digitizer = Some(digitizer);
        self.provider = Some(provider);

        if let Err(e) = self.select_input_mode() {
            log::warn!("Could not select device mode: {}", e);
        }
        if let Err(e) = self.publish_multitouch_interface() {
            self.release();
            return Err(e);
        }

        self.lifecycle.activate();
        Ok(())
    }

    /// Hand the parsed digitizer to the host.
    pub fn publish_multitouch_interface(&mut self) -> Result<(), DigitizerError> {
        let digitizer = self
            .digitizer
            .as_ref()
            .ok_or_else(|| DigitizerError::Publish("no digitizer has been parsed".into()))?;
        self.interface.publish(&digitizer.properties).map_err(|e| match e {
            DigitizerError::Publish(_) => e,
            other => DigitizerError::Publish(other.to_string()),
        })?;
        self.published = true;
        log::info!("Published multitouch interface");
        Ok(())
    }

    /// Entry point for every report delivered by the transport.
    pub fn handle_interrupt_report(
        &mut self,
        timestamp: Timestamp,
        report: &[u8],
        report_type: ReportType,
        report_id: u8,
    ) {
        if report_type != ReportType::Input || !self.awake {
            return;
        }
        if !self.lifecycle.begin_report() {
            return;
        }

        self.elements.process_report(report_id, report, timestamp);
        if let Some(digitizer) = self.digitizer.as_mut() {
            if let Some(frame) = tracker::handle_digitizer_report(digitizer, &self.elements, timestamp, report_id) {
                self.interface.handle_frame(digitizer, &frame);
            }
        }
        self.reports += 1;

        if self.lifecycle.end_report() {
            self.release();
        }
    }

    /// Gate report delivery on the device power state. Waking up selects
    /// the input mode again since devices reset it while powered down.
    pub fn set_power_state(&mut self, state: PowerState) -> Result<PowerAck, DigitizerError> {
        if matches!(
            self.lifecycle.state(),
            LifecycleState::TeardownPending | LifecycleState::Terminated
        ) {
            return Err(DigitizerError::NoDevice);
        }
        match state {
            PowerState::Off => {
                self.awake = false;
                log::debug!("Powered off, dropping reports");
            }
            PowerState::On => {
                self.awake = true;
                self.select_input_mode()?;
                log::debug!("Powered on");
            }
        }
        Ok(PowerAck)
    }

    /// The provider is going away. Completes at once unless a report is
    /// being handled, in which case teardown finishes when it returns.
    pub fn did_terminate(&mut self) -> Termination {
        let termination = self.lifecycle.request_teardown();
        if termination == Termination::Completed {
            self.release();
        }
        termination
    }

    /// Release the transducer table, unpublish and close the provider.
    pub fn handle_stop(&mut self) {
        self.lifecycle.request_teardown();
        self.release();
    }

    fn release(&mut self) {
        if self.published {
            self.interface.unpublish();
            self.published = false;
        }
        if self.digitizer.take().is_some() {
            log::info!("Digitizer released after {} reports", self.reports);
        }
        self.elements.detach();
        if let Some(mut provider) = self.provider.take() {
            provider.close();
        }
    }

    fn select_input_mode(&mut self) -> Result<(), DigitizerError> {
        let Some(element) = self.digitizer.as_ref().and_then(|d| d.input_mode_element) else {
            return Ok(());
        };
        let mode = self.settings.input_mode;
        self.elements.set_value(element, mode);
        let provider = self.provider.as_mut().ok_or(DigitizerError::NoDevice)?;
        provider.set_element_value(element, mode)?;
        log::info!("Selected device mode {}", mode);
        Ok(())
    }

    pub fn digitizer(&self) -> Option<&DigitizerSummary> {
        self.digitizer.as_ref()
    }

    pub fn elements(&self) -> &ElementDirectory {
        &self.elements
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn is_awake(&self) -> bool {
        self.awake
    }

    pub fn is_published(&self) -> bool {
        self.published
    }

    pub fn interface(&self) -> &I {
        &self.interface
    }

    pub fn reports_handled(&self) -> u64 {
        self.reports
    }
}
