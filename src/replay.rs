//! Recorded report logs.
//!
//! One report per line: a timestamp in microseconds followed by the report
//! bytes in hex. Bytes may be separated by whitespace or written as one
//! run. Blank lines and `#` comments are ignored.
//!
//! ```text
//! # finger down
//! 1000 01 07 01 64 00 c8 00 01
//! 9000 0107016e00c80001
//! ```

use thiserror::Error;

use crate::element::Timestamp;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportLogError {
    #[error("line {line}: missing report bytes")]
    MissingData { line: usize },
    #[error("line {line}: invalid timestamp '{value}'")]
    Timestamp { line: usize, value: String },
    #[error("line {line}: invalid hex '{value}'")]
    Hex { line: usize, value: String },
    #[error("line {line}: timestamp goes backwards")]
    OutOfOrder { line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRecord {
    /// Nanoseconds.
    pub timestamp: Timestamp,
    pub report_id: u8,
    /// The full report buffer, including the report ID byte if any.
    pub data: Vec<u8>,
}

/// Parse a report log. When `uses_report_ids` is set the first byte of each
/// report is its report ID, otherwise every report has ID 0.
pub fn parse_report_log(content: &str, uses_report_ids: bool) -> Result<Vec<ReportRecord>, ReportLogError> {
    let mut records: Vec<ReportRecord> = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        let text = raw.split('#').next().unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }

        let mut parts = text.split_whitespace();
        let stamp = parts.next().unwrap_or_default();
        let micros: u64 = stamp.parse().map_err(|_| ReportLogError::Timestamp {
            line,
            value: stamp.into(),
        })?;

        let mut data = Vec::new();
        for chunk in parts {
            decode_hex(chunk, &mut data).ok_or_else(|| ReportLogError::Hex {
                line,
                value: chunk.into(),
            })?;
        }
        if data.is_empty() {
            return Err(ReportLogError::MissingData { line });
        }

        let timestamp = micros.saturating_mul(1_000);
        if records.last().is_some_and(|last| last.timestamp > timestamp) {
            return Err(ReportLogError::OutOfOrder { line });
        }

        let report_id = if uses_report_ids { data[0] } else { 0 };
        records.push(ReportRecord {
            timestamp,
            report_id,
            data,
        });
    }

    log::debug!("Parsed {} reports", records.len());
    Ok(records)
}

fn decode_hex(chunk: &str, out: &mut Vec<u8>) -> Option<()> {
    let chunk = chunk.strip_prefix("0x").unwrap_or(chunk);
    if chunk.is_empty() || chunk.len() % 2 != 0 {
        return None;
    }
    for pair in chunk.as_bytes().chunks(2) {
        let pair = std::str::from_utf8(pair).ok()?;
        out.push(u8::from_str_radix(pair, 16).ok()?);
    }
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_report_ids() {
        let log = "# header\n\n1000 01 07 ff\n2000 0102  # trailing comment\n";
        let records = parse_report_log(log, true).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].timestamp, 1_000_000);
        assert_eq!(records[0].report_id, 1);
        assert_eq!(records[0].data, vec![0x01, 0x07, 0xff]);
        assert_eq!(records[1].data, vec![0x01, 0x02]);
    }

    #[test]
    fn test_parse_without_report_ids() {
        let records = parse_report_log("5 0x0a0b", false).unwrap();
        assert_eq!(records[0].report_id, 0);
        assert_eq!(records[0].data, vec![0x0a, 0x0b]);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        assert_eq!(
            parse_report_log("10 01\nabc 01", true),
            Err(ReportLogError::Timestamp { line: 2, value: "abc".into() })
        );
        assert_eq!(
            parse_report_log("10 0g", true),
            Err(ReportLogError::Hex { line: 1, value: "0g".into() })
        );
        assert_eq!(
            parse_report_log("10 012", true),
            Err(ReportLogError::Hex { line: 1, value: "012".into() })
        );
        assert_eq!(parse_report_log("10", true), Err(ReportLogError::MissingData { line: 1 }));
        assert_eq!(parse_report_log("20 01\n10 01", true), Err(ReportLogError::OutOfOrder { line: 2 }));
    }

    #[test]
    fn test_demo_log_replays_through_driver() {
        use crate::descriptor::{DescriptorFile, FixtureProvider};
        use crate::digitizer::{DigitizerProperties, DigitizerSummary};
        use crate::driver::{Driver, DriverSettings, MultitouchInterface, ReportType};
        use crate::error::DigitizerError;
        use crate::tracker::Frame;

        #[derive(Default)]
        struct Downs(Vec<usize>);

        impl MultitouchInterface for Downs {
            fn publish(&mut self, _: &DigitizerProperties) -> Result<(), DigitizerError> {
                Ok(())
            }

            fn handle_frame(&mut self, digitizer: &DigitizerSummary, frame: &Frame) {
                let down = frame.transducers.iter().filter(|&&i| digitizer.transducers[i].is_down()).count();
                self.0.push(down);
            }
        }

        let file = DescriptorFile::parse(include_str!("../demos/touchscreen.toml")).unwrap();
        let provider = FixtureProvider::new(&file).unwrap();
        let records = parse_report_log(include_str!("../demos/touchscreen.log"), provider.uses_report_ids()).unwrap();

        let mut driver = Driver::new(Downs::default(), DriverSettings::default());
        driver.handle_start(provider).unwrap();
        assert!(driver.digitizer().unwrap().input_mode_element.is_some());
        for record in &records {
            driver.handle_interrupt_report(record.timestamp, &record.data, ReportType::Input, record.report_id);
        }
        assert_eq!(driver.interface().0, vec![1, 2, 1, 0, 0]);
        assert_eq!(driver.digitizer().unwrap().transducers[0].x.value, 110);
    }
}
