//! Command-driven control plane for a Bluetooth low energy (LE) central.
//!
//! The crate discovers peripherals, manages their connections and lets an operator inspect and
//! modify their GATT profile through line-oriented commands. The radio itself is abstracted by
//! the [`Adapter`](central::bridge::Adapter) trait: the controller issues requests through it and
//! the adapter reports back, from whatever thread it likes, through a
//! [`CallbackRouter`](central::router::CallbackRouter).
//!
//! # Scheduling
//!
//! [`CentralManager`](central::CentralManager) runs a single-threaded cooperative loop. Each
//! iteration pumps the adapter's pending events into the discovered/connected snapshots and
//! then executes at most one command line taken from the
//! [`CommandChannel`](central::channel::CommandChannel). Snapshots are replaced wholesale, so a
//! command always sees a list published by exactly one adapter callback.
//!
//! `execute [idx]` enters a [`PeripheralSession`](central::session::PeripheralSession) on the same
//! thread; the controller loop resumes when the session ends, either on `exit` or because the
//! peripheral disconnected. Halting is cooperative and observed between iterations only.
//!
//! ## Example
//!
//! The following example runs the controller on its own thread against the simulated adapter.
//!
//! ```no_run
//! use central_shell::central::*;
//! use central_shell::sim::{self, SimAdapter, SimControl};
//! use std::thread;
//!
//! let in_range = vec![sim::device(1, "Thermometer", -60, &[])];
//! let (mut manager, commands) = CentralManager::new(|router| {
//!     SimAdapter::new(router, SimControl::new(), in_range)
//! });
//! let controller = thread::spawn(move || {
//!     manager.start();
//!     manager.shutdown()
//! });
//!
//! commands.send("scan").unwrap();
//! commands.send("list").unwrap();
//! if let Some(text) = commands.recv() {
//!     print!("{}", text);
//! }
//! commands.send("exit").unwrap();
//! controller.join().unwrap().unwrap();
//! ```
//!
//! See `demos/shell.rs` for an interactive shell.
#![deny(dead_code)]
#![deny(non_snake_case)]
#![deny(unused_imports)]
#![deny(unused_must_use)]

#[macro_use]
mod macros;

pub mod central;
pub mod error;
pub mod sim;
mod sync;
pub mod uuid;
mod util;

pub use error::{Error, ErrorKind, Result};
pub use sync::{Receiver, Sender};
