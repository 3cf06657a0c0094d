//! Decode HID digitizer reports into multitouch state.
//!
//! A [`driver::Driver`] parses the device's element tree once with
//! [`digitizer::parse_elements`], then turns every input report into a
//! [`tracker::Frame`] handed to a [`driver::MultitouchInterface`].

pub mod calibration;
pub mod descriptor;
pub mod digitizer;
pub mod driver;
pub mod element;
pub mod emit;
pub mod error;
pub mod replay;
pub mod tracker;
pub mod transducer;
pub mod usage;

#[cfg(test)]
mod testutil;

pub use digitizer::{parse_elements, DigitizerProperties, DigitizerSummary};
pub use driver::{Driver, DriverSettings, HidProvider, MultitouchInterface, PowerState, ReportType};
pub use element::{Element, ElementDirectory, ElementId, Timestamp};
pub use error::DigitizerError;
