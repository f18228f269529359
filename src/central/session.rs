use log::*;

use crate::error::{Error, ErrorKind, Result};
use crate::util::hex_value;
use crate::uuid::Uuid;

use super::command::{ReadTarget, SessionCommand, SessionVerb};
use super::peripheral::{ConnectionState, Peripheral, Subscription};
use super::router::PeripheralEvent;
use super::{CentralManager, Input};

const READ_USAGE: &str = "Read Profile\n\
    Usage: read <Profile UUID> [characteristic UUID]\n\
    Example: read 180A\n\
    \x20        read 180A 2A29\n";

const WRITE_USAGE: &str = "Write Characteristic\n\
    Usage: write <Profile UUID> <characteristic UUID> <hex value>\n\
    Example: write 1815 2A56 0x01\n";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Flow {
    Continue,
    Exit,
}

/// Interactive context scoped to one connected peripheral.
///
/// Runs on the controller's thread, keeping the controller's snapshots fresh while it waits
/// for input. Ends on `exit`, on end of input or as soon as the peripheral reports that it
/// disconnected. A line taken from the queue in the same iteration the disconnect is observed
/// is handed back to the controller.
pub struct PeripheralSession {
    peripheral: Peripheral,
    rssi: i32,
}

impl PeripheralSession {
    pub fn new(peripheral: Peripheral) -> Self {
        let rssi = peripheral.rssi();
        Self {
            peripheral,
            rssi,
        }
    }

    /// Returns the line left for the controller, if any.
    pub(in crate) fn run(mut self, manager: &mut CentralManager) -> Result<Option<String>> {
        info!("entering session of {}", self.peripheral);
        let subscription = self.peripheral.subscribe();
        let r = self.run_loop(manager, &subscription);
        info!("leaving session of {}", self.peripheral);
        r
    }

    fn run_loop(&mut self, manager: &mut CentralManager, subscription: &Subscription)
        -> Result<Option<String>>
    {
        loop {
            manager.pump();
            if self.drain(manager, subscription)? == Flow::Exit {
                return Ok(None);
            }

            let line = match manager.poll_input() {
                Input::Line(v) => v,
                Input::Idle => continue,
                Input::Eof => return Ok(None),
            };
            // Notifications published while waiting for the line.
            if self.drain(manager, subscription)? == Flow::Exit {
                return Ok(Some(line));
            }
            if self.execute_line(manager, &line)? == Flow::Exit {
                return Ok(None);
            }
        }
    }

    fn drain(&mut self, manager: &CentralManager, subscription: &Subscription) -> Result<Flow> {
        while let Some(event) = subscription.try_next() {
            match event {
                PeripheralEvent::RssiChanged(v) => self.rssi = v,
                PeripheralEvent::ConnectionStateChanged(ConnectionState::Disconnected) => {
                    manager.respond("Peripheral disconnected, exit ...\n")?;
                    return Ok(Flow::Exit);
                }
                PeripheralEvent::ConnectionStateChanged(_) => {}
            }
        }
        Ok(Flow::Continue)
    }

    fn execute_line(&mut self, manager: &mut CentralManager, line: &str) -> Result<Flow> {
        trace!("session command: {}", line.trim());
        match SessionCommand::parse(line) {
            SessionCommand::List => manager.respond(self.render_services())?,
            SessionCommand::Read(target) => match self.read(manager, target) {
                Err(e) if e.is_usage() => manager.respond(format!("{}\n", e))?,
                r => r?,
            },
            SessionCommand::Write { service, characteristic, value } => {
                manager.bridge_mut().write_characteristic(&self.peripheral, service, characteristic,
                    &value)?;
            }
            SessionCommand::State => manager.respond(self.render_state())?,
            SessionCommand::Debug(v) => {
                if let Some(v) = v {
                    self.peripheral.set_debug(v);
                }
                manager.respond(self.render_debug())?;
            }
            SessionCommand::Help => manager.respond(SessionVerb::render_help())?,
            SessionCommand::Exit => return Ok(Flow::Exit),
            SessionCommand::Invalid(verb, e) => {
                debug!("invalid `{}` arguments: {}", verb.as_str(), e);
                let text = match verb {
                    SessionVerb::Read => READ_USAGE.to_owned(),
                    SessionVerb::Write => WRITE_USAGE.to_owned(),
                    SessionVerb::Debug => format!("Only accept True/False\n{}", self.render_debug()),
                    _ => format!("{}\n", e),
                };
                manager.respond(text)?;
            }
            SessionCommand::Unknown(line) => {
                manager.respond(format!("*** Unknown syntax: {}\n", line))?;
            }
            SessionCommand::Empty => {}
        }
        Ok(Flow::Continue)
    }

    fn read(&self, manager: &mut CentralManager, target: ReadTarget) -> Result<()> {
        let (service_id, characteristic_id) = match target {
            ReadTarget::Service(s) => (s, None),
            ReadTarget::Characteristic(s, c) => (s, Some(c)),
        };
        let service = self.peripheral.service(service_id)
            .ok_or_else(|| unknown_attribute("service", service_id))?;

        let mut text = String::new();
        match characteristic_id {
            None => {
                text += &format!("{}\n", service);
                for c in service.characteristics() {
                    if c.properties().is_read() {
                        manager.bridge_mut().read_characteristic(&self.peripheral, service_id, c.id())?;
                    }
                    text += &format!("  {}\n", c);
                    text += &format!("    Description:  {}\n", c.description());
                    text += &format!("    Value      :  {}\n", hex_value(c.value()));
                }
            }
            Some(id) => {
                let c = service.characteristic(id)
                    .ok_or_else(|| unknown_attribute("characteristic", id))?;
                manager.bridge_mut().read_characteristic(&self.peripheral, service_id, id)?;
                text += &format!("{} {}\n", c, hex_value(c.value()));
            }
        }
        manager.respond(text)
    }

    fn render_services(&self) -> String {
        match self.peripheral.profile() {
            Some(services) => services.iter()
                .map(|s| format!("{}\n", s))
                .collect(),
            None => "Profile not discovered yet\n".into(),
        }
    }

    fn render_state(&self) -> String {
        let p = &self.peripheral;
        format!("{}\n  State : {}\n  RSSI  : {} (last notified: {})\n  Debug : {}\n",
            p, p.connection_state(), p.rssi(), self.rssi, p.is_debug())
    }

    fn render_debug(&self) -> String {
        format!("{} is {}in debug mode.\n", self.peripheral,
            if self.peripheral.is_debug() { "" } else { "not " })
    }
}

fn unknown_attribute(what: &str, id: Uuid) -> Error {
    Error::new(ErrorKind::UnknownAttribute, format!("Unknown {} {}", what, id.to_short_string()))
}
