// SPDX-License-Identifier: MIT

//! Command framing and the command/response exchange.

use crate::errors::*;
use crate::response::Response;
use crate::utils::{Retried, retry};
use crate::{CardTransport, FILLER};

/// Length of a command frame on the wire.
pub const COMMAND_LEN: usize = 6;
/// Start bit cleared, transmission bit set.
pub const COMMAND_PREFIX: u8 = 0x40;
/// Checksum sent with opcodes that don't need a real one.
pub const CHECKSUM_SENTINEL: u8 = 0xFF;
/// Polls allowed before a response is considered missing.
pub const DEFAULT_RESPONSE_RETRIES: usize = 5;

/// Argument of the interface condition check: 2.7-3.6V window, check pattern 0xAA.
pub const IF_COND_ARGUMENT: u32 = 0x0000_01AA;
/// Argument of the initialization request with host capacity support set.
pub const HCS_ARGUMENT: u32 = 0x4000_0000;

define_commands! {
    /// CMD0: software reset, enter SPI mode.
    GO_IDLE_STATE => 0, crc = 0x95;
    /// CMD8: interface condition check (voltage + check pattern echo).
    SEND_IF_COND => 8, crc = 0x87;
    /// CMD17: read one block at the given byte address.
    READ_SINGLE_BLOCK => 17;
    /// ACMD41: start initialization, optionally requesting high capacity.
    SD_SEND_OP_COND => 41;
    /// CMD55: the next command is application specific.
    APP_CMD => 55;
    /// CMD58: read the operating conditions register.
    READ_OCR => 58;
}

/// A single card command, built per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub opcode: u8,
    pub argument: u32,
}

impl Command {
    #[inline]
    pub const fn new(opcode: u8, argument: u32) -> Self {
        Self {
            opcode: opcode & 0x3F,
            argument,
        }
    }

    #[inline]
    pub const fn checksum(&self) -> u8 {
        fixed_checksum(self.opcode)
    }

    /// Wire form: prefixed opcode, big-endian argument, checksum.
    pub const fn encode(&self) -> [u8; COMMAND_LEN] {
        let arg = self.argument.to_be_bytes();
        [
            COMMAND_PREFIX | self.opcode,
            arg[0],
            arg[1],
            arg[2],
            arg[3],
            self.checksum(),
        ]
    }

    pub fn name(&self) -> &'static str {
        command_name(self.opcode)
    }
}

/// Command/response helpers available on every transport.
pub trait CommandExt: CardTransport {
    /// Sends one command frame.
    fn send_command(&mut self, command: Command) -> CommandResult {
        let mut frame = command.encode();
        log::trace!(
            "-> {} (CMD{}) arg={:#010X}",
            command.name(),
            command.opcode,
            command.argument
        );
        self.exchange(&mut frame)?;
        Ok(())
    }

    /// Reads an `N` byte response with the default poll budget.
    fn read_response<const N: usize>(&mut self, opcode: u8) -> CommandResult<Response<N>> {
        self.read_response_with(opcode, DEFAULT_RESPONSE_RETRIES)
    }

    /// Polls single bytes until one is not filler, then reads the remaining `N - 1`.
    ///
    /// The poll that found the first byte counts towards `retries`.
    fn read_response_with<const N: usize>(
        &mut self,
        opcode: u8,
        retries: usize,
    ) -> CommandResult<Response<N>> {
        let polled = retry(retries, |_| -> TransportResult<Option<u8>> {
            let mut byte = [FILLER];
            self.exchange(&mut byte)?;
            Ok((byte[0] != FILLER).then_some(byte[0]))
        })?;

        let (first, attempts) = match polled {
            Retried::Done { value, attempts } => (value, attempts),
            Retried::Exhausted { .. } => return Err(CommandError::NoResponse { opcode }),
        };

        let mut bytes = [FILLER; N];
        if N > 0 {
            bytes[0] = first;
        }
        if N > 1 {
            self.exchange(&mut bytes[1..])?;
        }

        log::trace!("<- CMD{opcode} {bytes:02X?} after {attempts} polls");
        Ok(Response { bytes, attempts })
    }

    /// Sends `command` and reads its `N` byte response.
    fn command<const N: usize>(
        &mut self,
        command: Command,
        retries: usize,
    ) -> CommandResult<Response<N>> {
        self.send_command(command)?;
        self.read_response_with(command.opcode, retries)
    }
}

impl<T: CardTransport + ?Sized> CommandExt for T {}
