pub mod bridge;
pub mod channel;
pub mod characteristic;
pub mod command;
pub mod peripheral;
pub mod router;
pub mod service;
pub mod session;

use log::*;
use static_assertions::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::sync::{self, Receiver, Sender};

use bridge::{Adapter, Bridge};
use channel::CommandChannel;
use command::{Command, Index, Verb};
use peripheral::Peripheral;
use router::{AdapterEvent, CallbackRouter};
use session::PeripheralSession;

/// Immutable list of peripherals as published by one adapter callback.
pub type Snapshot = Arc<[Peripheral]>;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RunState {
    Stopped,
    Running,
    /// Halt was requested, the loop exits at the next iteration boundary.
    Halting,
}

/// Requests a cooperative halt of the scheduler loop. Can be used from any thread.
#[derive(Clone, Debug)]
pub struct HaltHandle(Arc<AtomicBool>);

assert_impl_all!(HaltHandle: Send, Sync);

impl HaltHandle {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn halt(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_halted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub struct CentralManagerBuilder {
    pump_budget: usize,
    idle_wait: Duration,
}

impl CentralManagerBuilder {
    pub fn new() -> Self {
        Self {
            pump_budget: 64,
            idle_wait: Duration::from_millis(10),
        }
    }

    /// Maximum number of adapter events applied per pump.
    pub fn pump_budget(&mut self, v: usize) -> &mut Self {
        self.pump_budget = v.max(1);
        self
    }

    /// How long polling for the next command line may wait before reporting there's none.
    /// Zero makes polling strictly non-blocking.
    pub fn idle_wait(&mut self, v: Duration) -> &mut Self {
        self.idle_wait = v;
        self
    }

    /// Builds the controller. `new_adapter` receives the router the adapter must report to.
    pub fn build<A, F>(&self, new_adapter: F) -> (CentralManager, CommandChannel)
    where
        A: Adapter + 'static,
        F: FnOnce(CallbackRouter) -> A,
    {
        CentralManager::build(self, |router| Box::new(new_adapter(router)) as Box<dyn Adapter>)
    }
}

impl Default for CentralManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub(in crate) enum Input {
    Line(String),
    Idle,
    /// Every command sender is gone.
    Eof,
}

/// The scheduler and command dispatcher.
///
/// A single thread runs [`start`](Self::start), which alternates between pumping adapter
/// events into the snapshots and executing at most one command line. Commands come from the
/// [`CommandChannel`] returned by the builder, responses go back through it.
pub struct CentralManager {
    bridge: Bridge,
    events: Receiver<AdapterEvent>,
    inbound: Receiver<String>,
    outbound: Sender<String>,
    halt: HaltHandle,
    running: bool,
    ready: bool,
    discovered: Snapshot,
    connected: Snapshot,
    exit_disconnected: bool,
    shut_down: bool,
    pump_budget: usize,
    idle_wait: Duration,
}

assert_impl_all!(CentralManager: Send);

impl CentralManager {
    pub fn new<A, F>(new_adapter: F) -> (Self, CommandChannel)
    where
        A: Adapter + 'static,
        F: FnOnce(CallbackRouter) -> A,
    {
        CentralManagerBuilder::new().build(new_adapter)
    }

    pub fn builder() -> CentralManagerBuilder {
        CentralManagerBuilder::new()
    }

    fn build(b: &CentralManagerBuilder, new_adapter: impl FnOnce(CallbackRouter) -> Box<dyn Adapter>)
        -> (Self, CommandChannel)
    {
        let (router, events) = CallbackRouter::new();
        let adapter = new_adapter(router);
        let (inbound_sender, inbound) = sync::channel();
        let (outbound, outbound_receiver) = sync::channel();
        let empty: Snapshot = Vec::new().into();
        let this = Self {
            bridge: Bridge::new(adapter),
            events,
            inbound,
            outbound,
            halt: HaltHandle::new(),
            running: false,
            ready: false,
            discovered: empty.clone(),
            connected: empty,
            exit_disconnected: false,
            shut_down: false,
            pump_budget: b.pump_budget,
            idle_wait: b.idle_wait,
        };
        (this, CommandChannel::new(inbound_sender, outbound_receiver))
    }

    pub fn halt_handle(&self) -> HaltHandle {
        self.halt.clone()
    }

    pub fn halt(&self) {
        self.halt.halt();
    }

    pub fn run_state(&self) -> RunState {
        match (self.running, self.halt.is_halted()) {
            (false, _) => RunState::Stopped,
            (true, false) => RunState::Running,
            (true, true) => RunState::Halting,
        }
    }

    /// Whether the adapter reported readiness. Never reverts to `false`.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn discovered(&self) -> Snapshot {
        self.discovered.clone()
    }

    pub fn connected(&self) -> Snapshot {
        self.connected.clone()
    }

    /// Runs the scheduler loop until halted.
    ///
    /// The halt flag is never cleared: once a halt was requested, `start` returns immediately.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        if self.halt.is_halted() {
            debug!("halt already requested, not starting");
            return;
        }
        info!("central manager started");
        while self.step() {}
        info!("central manager stopped");
    }

    /// Runs one scheduler iteration: pumps adapter events, then executes at most one command.
    /// Returns `false` once the controller is halted.
    pub fn step(&mut self) -> bool {
        if self.halt.is_halted() {
            self.running = false;
            return false;
        }
        self.running = true;

        self.pump();

        let line = match self.poll_input() {
            Input::Line(v) => v,
            Input::Idle => return true,
            Input::Eof => {
                debug!("command channel closed");
                Verb::Exit.as_str().into()
            }
        };
        if let Err(e) = self.execute_line(&line) {
            error!("command `{}` failed, halting: {}", line.trim(), e);
            self.halt();
        }
        true
    }

    /// Deterministic teardown: disconnects everything still connected and releases the
    /// adapter. Only the first call has an effect.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        self.pump();
        if !self.connected.is_empty() && !self.exit_disconnected {
            self.bridge.disconnect_all()?;
        }
        self.bridge.shutdown()?;
        info!("central manager shut down");
        Ok(())
    }

    fn execute_line(&mut self, line: &str) -> Result<()> {
        trace!("command: {}", line.trim());
        match Command::parse(line) {
            Command::Scan => self.bridge.start_scan(),
            Command::Stop => self.bridge.stop_scan(),
            Command::List => self.respond(render_list(&self.discovered)),
            Command::Con => self.respond(render_list(&self.connected)),
            Command::Connect(idx) => match pick(&self.discovered, idx) {
                Some(p) => self.bridge.connect(&p),
                None => Ok(()),
            },
            Command::Disconnect(idx) => match pick(&self.connected, idx) {
                Some(p) => self.bridge.disconnect(&p),
                None => Ok(()),
            },
            Command::ConnectAll => {
                let peripherals = self.discovered.clone();
                if peripherals.is_empty() {
                    return Ok(());
                }
                self.bridge.connect_all(&peripherals)
            }
            Command::DisconnectAll => self.bridge.disconnect_all(),
            Command::Execute(idx) => {
                let p = match pick(&self.connected, idx) {
                    Some(v) => v,
                    None => return Ok(()),
                };
                match PeripheralSession::new(p).run(self)? {
                    Some(line) => {
                        debug!("session ended, passing on `{}`", line.trim());
                        self.execute_line(&line)
                    }
                    None => Ok(()),
                }
            }
            Command::Help => self.respond(Verb::render_help()),
            Command::Exit => {
                self.exit();
                Ok(())
            }
            Command::Unknown(line) => {
                debug!("unknown command: {}", line);
                self.respond(format!("*** Unknown syntax: {}\n", line))
            }
            Command::Empty => Ok(()),
        }
    }

    fn exit(&mut self) {
        if !self.connected.is_empty() {
            match self.bridge.disconnect_all() {
                Ok(()) => self.exit_disconnected = true,
                Err(e) => warn!("couldn't disconnect peripherals on exit: {}", e),
            }
        }
        self.halt();
    }

    /// Applies at most `pump_budget` pending adapter events. Never blocks.
    pub(in crate) fn pump(&mut self) -> usize {
        self.bridge.run_once();
        let mut n = 0;
        while n < self.pump_budget {
            match self.events.try_recv() {
                Ok(event) => self.apply(event),
                Err(_) => break,
            }
            n += 1;
        }
        n
    }

    fn apply(&mut self, event: AdapterEvent) {
        match event {
            AdapterEvent::Ready => {
                if !self.ready {
                    info!("adapter is ready");
                    self.ready = true;
                }
            }
            AdapterEvent::DiscoveredListChanged { peripherals } => {
                debug!("discovered list updated: {} peripherals", peripherals.len());
                self.discovered = peripherals.into();
            }
            AdapterEvent::ConnectedListChanged { peripherals } => {
                debug!("connected list updated: {} peripherals", peripherals.len());
                self.connected = peripherals.into();
            }
        }
    }

    pub(in crate) fn poll_input(&self) -> Input {
        if self.idle_wait == Duration::from_secs(0) {
            match self.inbound.try_recv() {
                Ok(v) => Input::Line(v),
                Err(TryRecvError::Empty) => Input::Idle,
                Err(TryRecvError::Disconnected) => Input::Eof,
            }
        } else {
            match self.inbound.recv_timeout(self.idle_wait) {
                Ok(v) => Input::Line(v),
                Err(RecvTimeoutError::Timeout) => Input::Idle,
                Err(RecvTimeoutError::Disconnected) => Input::Eof,
            }
        }
    }

    pub(in crate) fn respond(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        if text.is_empty() {
            return Ok(());
        }
        self.outbound.send(text).map_err(|_| Error::channel_closed())
    }

    pub(in crate) fn bridge_mut(&mut self) -> &mut Bridge {
        &mut self.bridge
    }
}

fn pick(snapshot: &Snapshot, idx: Index) -> Option<Peripheral> {
    idx.resolve(snapshot.len()).map(|i| snapshot[i].clone())
}

fn render_list(peripherals: &[Peripheral]) -> String {
    let mut r = String::new();
    for (i, p) in peripherals.iter().enumerate() {
        let adv = p.advertisement_data();
        let tx_power_level = adv.tx_power_level()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "n/a".into());
        let uuids = adv.service_uuids().iter()
            .map(|v| v.to_short_string())
            .collect::<Vec<_>>()
            .join(", ");
        r += &format!("{:2} : {}\n", i, p.name());
        r += &format!("     RSSI         : {}\n", p.rssi());
        r += &format!("     TxPowerLevel : {}\n", tx_power_level);
        r += &format!("     Service UUIDs: {{{}}}\n", uuids);
    }
    r
}

#[cfg(test)]
mod test;
