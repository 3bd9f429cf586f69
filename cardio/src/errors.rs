// SPDX-License-Identifier: MIT

use core::fmt;

use crate::card::CardState;

/// Failure of the underlying byte exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    Bus(&'static str),
    OutOfBounds,
    Unsupported,
    Other(&'static str),
}

impl TransportError {
    pub fn msg(&self) -> &'static str {
        match self {
            TransportError::Bus(msg) => msg,
            TransportError::OutOfBounds => "Out of bounds",
            TransportError::Unsupported => "Unsupported operation",
            TransportError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<CardError> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    Transport(TransportError),
    /// Only filler bytes were seen while polling for a response.
    NoResponse { opcode: u8 },
    Other(&'static str),
}

impl CommandError {
    pub fn msg(&self) -> &'static str {
        match self {
            CommandError::Transport(_) => "Transport error",
            CommandError::NoResponse { .. } => "No response from card",
            CommandError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<CardError> {
        match self {
            CommandError::Transport(e) => Some(CardError::Transport(*e)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    Command(CommandError),
    ResetTimeout,
    InitTimeout,
    VoltageRejected { status: u8 },
    SpeedUpFailed(TransportError),
    InvalidState(CardState),
    Other(&'static str),
}

impl InitError {
    pub fn msg(&self) -> &'static str {
        match self {
            InitError::Command(_) => "Command error",
            InitError::ResetTimeout => "Card did not enter idle state after reset",
            InitError::InitTimeout => "Card did not leave idle state during initialization",
            InitError::VoltageRejected { .. } => "Card rejected the operating conditions query",
            InitError::SpeedUpFailed(_) => "Clock speed-up failed",
            InitError::InvalidState(_) => "Bring-up already ran on this session",
            InitError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<CardError> {
        match self {
            InitError::Command(e) => Some(CardError::Command(*e)),
            InitError::SpeedUpFailed(e) => Some(CardError::Transport(*e)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    Command { block: u32, source: CommandError },
    ReadRejected { block: u32, status: u8 },
    BadStartToken { block: u32, token: u8 },
    AddressOverflow { block: u64 },
    BufferSize { expected: usize, found: usize },
    NotReady,
    Other(&'static str),
}

impl BlockError {
    pub fn msg(&self) -> &'static str {
        match self {
            BlockError::Command { .. } => "Command error while reading block",
            BlockError::ReadRejected { .. } => "Card rejected block read",
            BlockError::BadStartToken { .. } => "Unexpected data start token",
            BlockError::AddressOverflow { .. } => "Block address out of range",
            BlockError::BufferSize { .. } => "Buffer does not match block size",
            BlockError::NotReady => "Card is not ready",
            BlockError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<CardError> {
        match self {
            BlockError::Command { source, .. } => Some(CardError::Command(*source)),
            _ => None,
        }
    }

    /// Block index the failure is attached to, if any.
    pub fn block(&self) -> Option<u64> {
        match self {
            BlockError::Command { block, .. }
            | BlockError::ReadRejected { block, .. }
            | BlockError::BadStartToken { block, .. } => Some(*block as u64),
            BlockError::AddressOverflow { block } => Some(*block),
            _ => None,
        }
    }
}

/// Top-level error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardError {
    Transport(TransportError),
    Command(CommandError),
    Init(InitError),
    Block(BlockError),
    Other(&'static str),
}

impl CardError {
    pub fn msg(&self) -> &'static str {
        match self {
            CardError::Transport(e) => e.msg(),
            CardError::Command(e) => e.msg(),
            CardError::Init(e) => e.msg(),
            CardError::Block(e) => e.msg(),
            CardError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<CardError> {
        match self {
            CardError::Transport(e) => e.source(),
            CardError::Command(e) => e.source(),
            CardError::Init(e) => e.source(),
            CardError::Block(e) => e.source(),
            CardError::Other(_) => None,
        }
    }
}

fn write_chain(f: &mut fmt::Formatter<'_>, mut current: Option<CardError>) -> fmt::Result {
    while let Some(src) = current {
        write!(f, "\n  caused by: {}", src.msg())?;
        current = src.source();
    }
    Ok(())
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        Ok(())
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        if let CommandError::NoResponse { opcode } = self {
            write!(f, " (CMD{opcode})")?;
        }
        write_chain(f, self.source())
    }
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        match self {
            InitError::VoltageRejected { status } => write!(f, " (R1: {status:#04X})")?,
            InitError::InvalidState(state) => write!(f, " (state: {state:?})")?,
            _ => {}
        }
        write_chain(f, self.source())
    }
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        match self {
            BlockError::Command { block, .. } => write!(f, " (block: {block})")?,
            BlockError::ReadRejected { block, status } => {
                write!(f, " (block: {block}, R1: {status:#04X})")?
            }
            BlockError::BadStartToken { block, token } => {
                write!(f, " (block: {block}, token: {token:#04X})")?
            }
            BlockError::AddressOverflow { block } => write!(f, " (block: {block})")?,
            BlockError::BufferSize { expected, found } => {
                write!(f, " (expected: {expected}, found: {found})")?
            }
            _ => {}
        }
        write_chain(f, self.source())
    }
}

impl fmt::Display for CardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardError::Transport(e) => write!(f, "{e}"),
            CardError::Command(e) => write!(f, "{e}"),
            CardError::Init(e) => write!(f, "{e}"),
            CardError::Block(e) => write!(f, "{e}"),
            CardError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl core::error::Error for CardError {}
impl core::error::Error for InitError {}
impl core::error::Error for BlockError {}

// === type *Result ===

pub type CardResult<T = ()> = Result<T, CardError>;
pub type TransportResult<T = ()> = Result<T, TransportError>;
pub type CommandResult<T = ()> = Result<T, CommandError>;
pub type InitResult<T = ()> = Result<T, InitError>;
pub type BlockResult<T = ()> = Result<T, BlockError>;

crate::card_error_wiring! {
    top => CardError {
        TransportError : Transport,
        CommandError   : Command,
        InitError      : Init,
        BlockError     : Block,
    },
    str_into => [
        TransportError,
        CommandError,
        InitError,
        BlockError,
    ],
    sub => {
        TransportError => [ CommandError::Transport ],
        CommandError   => [ InitError::Command ],
    },
}
