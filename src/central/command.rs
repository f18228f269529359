//! Command lines, parsed into tagged variants.
//!
//! A line is a verb followed by an optional argument string. Verbs are matched exactly
//! (case-sensitive) against the tables below.

use std::convert::TryFrom;
use std::num::IntErrorKind;

use crate::error::{Error, ErrorKind, Result};
use crate::uuid::Uuid;

verbs! {
    /// Verbs understood by the controller.
    pub enum Verb {
        /// Start discovery
        Scan => "scan",
        /// Stop discovery
        Stop => "stop",
        /// List available peripherals
        List => "list",
        /// List connected peripherals
        Con => "con",
        /// Connect available peripheral [idx] (default 0)
        Connect => "connect",
        /// Disconnect connected peripheral [idx] (default 0)
        Disconnect => "disconnect",
        /// Connect all available peripherals
        ConnectAll => "connectAll",
        /// Disconnect all connected peripherals
        DisconnectAll => "disconnectAll",
        /// Enter the shell of connected peripheral [idx] (default 0)
        Execute => "execute",
        /// List commands
        Help => "help",
        /// Disconnect everything and exit
        Exit => "exit",
    }
}

verbs! {
    /// Verbs understood inside a peripheral session.
    pub enum SessionVerb {
        /// Show supported services
        List => "list",
        /// Read a service or one of its characteristics
        Read => "read",
        /// Write a characteristic value
        Write => "write",
        /// Show peripheral state
        State => "state",
        /// Show or set peripheral debugging [True|False]
        Debug => "debug",
        /// List commands
        Help => "help",
        /// Leave the peripheral shell
        Exit => "exit",
    }
}

/// Position in a peripheral snapshot as given by the operator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Index {
    /// No index, or an argument that isn't an integer: the first entry.
    First,
    At(usize),
    /// A negative integer, or one too large to be an index. Never refers to an entry.
    OutOfRange,
}

impl Index {
    pub fn parse(args: &str) -> Self {
        match args.trim().parse::<i64>() {
            Ok(v) => usize::try_from(v).map(Self::At).unwrap_or(Self::OutOfRange),
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => Self::OutOfRange,
                _ => Self::First,
            },
        }
    }

    /// Resolves against a snapshot of `len` entries. `None` if out of range.
    pub fn resolve(self, len: usize) -> Option<usize> {
        let idx = match self {
            Self::First => 0,
            Self::At(v) => v,
            Self::OutOfRange => return None,
        };
        if idx < len {
            Some(idx)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Scan,
    Stop,
    List,
    Con,
    Connect(Index),
    Disconnect(Index),
    ConnectAll,
    DisconnectAll,
    Execute(Index),
    Help,
    Exit,
    Unknown(String),
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let (verb, args) = split(line);
        if verb.is_empty() {
            return Self::Empty;
        }
        let verb = match Verb::lookup(verb) {
            Some(v) => v,
            None => return Self::Unknown(line.trim().into()),
        };
        match verb {
            Verb::Scan => Self::Scan,
            Verb::Stop => Self::Stop,
            Verb::List => Self::List,
            Verb::Con => Self::Con,
            Verb::Connect => Self::Connect(Index::parse(args)),
            Verb::Disconnect => Self::Disconnect(Index::parse(args)),
            Verb::ConnectAll => Self::ConnectAll,
            Verb::DisconnectAll => Self::DisconnectAll,
            Verb::Execute => Self::Execute(Index::parse(args)),
            Verb::Help => Self::Help,
            Verb::Exit => Self::Exit,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadTarget {
    Service(Uuid),
    Characteristic(Uuid, Uuid),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionCommand {
    List,
    Read(ReadTarget),
    Write {
        service: Uuid,
        characteristic: Uuid,
        value: Vec<u8>,
    },
    State,
    /// `None` only reports the current flag.
    Debug(Option<bool>),
    Help,
    Exit,
    /// Arguments of a known verb failed validation.
    Invalid(SessionVerb, Error),
    Unknown(String),
    Empty,
}

impl SessionCommand {
    pub fn parse(line: &str) -> Self {
        let (verb, args) = split(line);
        if verb.is_empty() {
            return Self::Empty;
        }
        let verb = match SessionVerb::lookup(verb) {
            Some(v) => v,
            None => return Self::Unknown(line.trim().into()),
        };
        let r = match verb {
            SessionVerb::List => Ok(Self::List),
            SessionVerb::Read => parse_read(args).map(Self::Read),
            SessionVerb::Write => parse_write(args),
            SessionVerb::State => Ok(Self::State),
            SessionVerb::Debug => parse_debug(args).map(Self::Debug),
            SessionVerb::Help => Ok(Self::Help),
            SessionVerb::Exit => Ok(Self::Exit),
        };
        r.unwrap_or_else(|e| Self::Invalid(verb, e))
    }
}

fn split(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.find(char::is_whitespace) {
        Some(i) => (&line[..i], line[i..].trim_start()),
        None => (line, ""),
    }
}

fn parse_read(args: &str) -> Result<ReadTarget> {
    let args: Vec<_> = args.split_whitespace().collect();
    match args[..] {
        [service] => Ok(ReadTarget::Service(service.parse()?)),
        [service, characteristic] =>
            Ok(ReadTarget::Characteristic(service.parse()?, characteristic.parse()?)),
        _ => Err(Error::new(ErrorKind::InvalidValue, "expected 1 or 2 arguments")),
    }
}

fn parse_write(args: &str) -> Result<SessionCommand> {
    let args: Vec<_> = args.split_whitespace().collect();
    match args[..] {
        [service, characteristic, value] => Ok(SessionCommand::Write {
            service: service.parse()?,
            characteristic: characteristic.parse()?,
            value: hex::decode(value.trim_start_matches("0x"))?,
        }),
        _ => Err(Error::new(ErrorKind::InvalidValue, "expected 3 arguments")),
    }
}

fn parse_debug(args: &str) -> Result<Option<bool>> {
    match args.trim() {
        "" => Ok(None),
        "True" => Ok(Some(true)),
        "False" => Ok(Some(false)),
        v => Err(Error::new(ErrorKind::InvalidDebugArgument, format!("invalid debug option: {}", v))),
    }
}
