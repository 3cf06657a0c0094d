mod config;
mod sink;

use std::path::Path;
use std::thread;
use std::time::Duration;

use clap::Parser;

use mt_hid::descriptor::{DescriptorFile, FixtureProvider};
use mt_hid::replay::parse_report_log;
use mt_hid::{parse_elements, Driver, DriverSettings, ReportType};

use config::{Cli, Command, Config};
use sink::EvdevInterface;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn main() -> Result<(), BoxError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load(&cli);
    if let Err(e) = config.validate(&cli.command) {
        log::error!("{}", e);
        std::process::exit(1);
    }

    let descriptor = config.descriptor.as_deref().ok_or("No descriptor given")?;
    let file = DescriptorFile::load(descriptor)?;

    match &cli.command {
        Command::Describe => describe(&config, &file),
        Command::Replay { log, realtime } => replay(&config, &file, log, *realtime),
    }
}

fn describe(config: &Config, file: &DescriptorFile) -> Result<(), BoxError> {
    let mut elements = file.to_directory()?;
    log::info!("{}: {} elements", file.name, elements.len());
    let digitizer = parse_elements(&mut elements, config.removal_percentage)?;

    println!("{}", digitizer.properties);
    for transducer in &digitizer.transducers {
        let bound = &transducer.elements;
        println!(
            "  #{:<2} {:<6} collection {} report {}  x<={} y<={}  pressure={} tilt={} buttons={}",
            transducer.id,
            transducer.kind.to_string(),
            transducer.collection,
            transducer.report_id,
            transducer.logical_max_x,
            transducer.logical_max_y,
            bound.tip_pressure.is_some(),
            bound.tilt_x.is_some() || bound.tilt_y.is_some(),
            bound.buttons.len(),
        );
    }
    Ok(())
}

fn replay(config: &Config, file: &DescriptorFile, log_path: &Path, realtime: bool) -> Result<(), BoxError> {
    let provider = FixtureProvider::new(file)?;
    let uses_report_ids = provider.uses_report_ids();

    let content = std::fs::read_to_string(log_path)
        .map_err(|e| format!("Failed to read {}: {}", log_path.display(), e))?;
    let records = parse_report_log(&content, uses_report_ids)
        .map_err(|e| format!("{}: {}", log_path.display(), e))?;
    log::info!("Replaying {} reports from {}", records.len(), log_path.display());

    let interface = EvdevInterface::new(config.device_name.clone(), config.uinput, !config.quiet);
    let settings = DriverSettings {
        removal_percentage: config.removal_percentage,
        input_mode: config.input_mode,
    };
    let mut driver = Driver::new(interface, settings);
    driver.handle_start(provider)?;

    if config.uinput {
        // Give the desktop time to pick up the new device.
        thread::sleep(Duration::from_secs(1));
    }

    let mut previous = None;
    for record in &records {
        if realtime {
            if let Some(previous) = previous {
                thread::sleep(Duration::from_nanos(record.timestamp - previous));
            }
            previous = Some(record.timestamp);
        }
        driver.handle_interrupt_report(record.timestamp, &record.data, ReportType::Input, record.report_id);
    }

    log::info!(
        "Replay finished: {} reports, {} frames, {} events",
        driver.reports_handled(),
        driver.interface().frames(),
        driver.interface().events()
    );
    driver.handle_stop();
    Ok(())
}
