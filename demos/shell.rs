use anyhow::*;
use std::result::Result::Ok;
use log::*;
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;
use central_shell::central::*;
use central_shell::central::characteristic::{Characteristic, Property};
use central_shell::central::service::Service;
use central_shell::sim::{self, SimAdapter, SimControl};
use central_shell::uuid::Uuid;

fn uuid(s: &str) -> Result<Uuid> {
    s.parse().map_err(|e| anyhow!("invalid UUID {}: {}", s, e))
}

fn device_information(manufacturer: &str) -> Result<Service> {
    Ok(Service::new(uuid("180A")?, vec![
        Characteristic::new(uuid("2A29")?, "Manufacturer Name String", Property::Read)
            .with_value(manufacturer.as_bytes()),
        Characteristic::new(uuid("2A24")?, "Model Number String", Property::Read)
            .with_value(&b"SIM-1"[..]),
    ]))
}

pub fn main() -> Result<()> {
    env_logger::from_env(env_logger::Env::default()
        .default_filter_or("info")).init();

    use clap::Arg;
    let clapp = clap::App::new("Central Shell")
        .about("Interactive Bluetooth LE central shell backed by a simulated radio")
        .arg(Arg::new("pump-budget")
            .long("pump-budget")
            .help("Maximum number of adapter events applied per scheduler iteration")
            .takes_value(true))
        .arg(Arg::new("idle-ms")
            .long("idle-ms")
            .help("How long the scheduler waits for a command before pumping again")
            .takes_value(true));
    let matches = clapp.get_matches();

    let mut builder = CentralManager::builder();
    if let Some(v) = matches.value_of("pump-budget") {
        builder.pump_budget(v.parse().map_err(|_| anyhow!("invalid 'pump-budget': {}", v))?);
    }
    if let Some(v) = matches.value_of("idle-ms") {
        let ms = v.parse().map_err(|_| anyhow!("invalid 'idle-ms': {}", v))?;
        builder.idle_wait(Duration::from_millis(ms));
    }

    let thermometer = sim::device(1, "Thermometer", -58, &[uuid("1809")?, uuid("180A")?]);
    let lamp = sim::device(2, "Lamp", -71, &[uuid("1815")?]);
    let lamp_profile = vec![
        Service::new(uuid("1815")?, vec![
            Characteristic::new(uuid("2A56")?, "Digital", Property::Read | Property::Write)
                .with_value(vec![0]),
        ]),
        device_information("Lumen")?,
    ];
    let thermometer_profile = vec![
        Service::new(uuid("1809")?, vec![
            Characteristic::new(uuid("2A1C")?, "Temperature Measurement",
                Property::Read | Property::Indicate)
                .with_value(vec![0x00, 0xe4, 0x00, 0x00, 0xfe]),
        ]),
        device_information("Acme")?,
    ];
    let in_range = vec![thermometer.clone(), lamp.clone()];

    let (mut manager, commands) = builder.build(|router| {
        SimAdapter::new(router, SimControl::new(), in_range)
            .with_profile(thermometer.id(), thermometer_profile)
            .with_profile(lamp.id(), lamp_profile)
    });

    let (sender, responses) = commands.into_parts();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(v) => v,
                Err(e) => {
                    error!("couldn't read stdin: {}", e);
                    break;
                }
            };
            if sender.send(line).is_err() {
                break;
            }
        }
    });
    thread::spawn(move || {
        for text in responses.iter() {
            print!("{}", text);
            let _ = io::stdout().flush();
        }
    });

    println!("Type `help` for the list of commands.");
    manager.start();
    manager.shutdown()?;

    Ok(())
}
