// SPDX-License-Identifier: MIT

//! Card session and the bring-up sequence.

use crate::command::*;
use crate::errors::*;
use crate::response::*;
use crate::utils::{Retried, retry};
use crate::{CardTransport, FILLER};

/// Idle bytes clocked before the first command (80 clocks, at least 74 are required).
pub const DEFAULT_WARMUP_BYTES: usize = 10;
pub const DEFAULT_RESET_RETRIES: usize = 3;
pub const DEFAULT_INIT_RETRIES: usize = 10;

/// Block size of a standard capacity card.
pub const STANDARD_BLOCK_SIZE: usize = 256;
/// Block size of a high capacity card.
pub const HIGH_CAPACITY_BLOCK_SIZE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardState {
    Unpowered,
    WarmedUp,
    Reset,
    VersionChecked,
    VoltageNegotiated,
    Ready,
    Failed,
}

/// Which command set the card answered the interface check with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardVersion {
    /// Echoed the interface condition, may be high capacity.
    V2,
    Legacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityClass {
    Standard,
    High,
}

impl CapacityClass {
    #[inline]
    pub fn block_size(&self) -> usize {
        match self {
            CapacityClass::Standard => STANDARD_BLOCK_SIZE,
            CapacityClass::High => HIGH_CAPACITY_BLOCK_SIZE,
        }
    }
}

/// Bring-up tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BringUpConfig {
    pub warmup_bytes: usize,
    pub reset_retries: usize,
    pub init_retries: usize,
    pub response_retries: usize,
    /// Clock rate to switch to once the card is ready.
    pub speed_up_hz: Option<u32>,
}

impl Default for BringUpConfig {
    fn default() -> Self {
        Self {
            warmup_bytes: DEFAULT_WARMUP_BYTES,
            reset_retries: DEFAULT_RESET_RETRIES,
            init_retries: DEFAULT_INIT_RETRIES,
            response_retries: DEFAULT_RESPONSE_RETRIES,
            speed_up_hz: None,
        }
    }
}

impl BringUpConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_warmup_bytes(mut self, n: usize) -> Self {
        self.warmup_bytes = n;
        self
    }
    pub fn with_reset_retries(mut self, n: usize) -> Self {
        self.reset_retries = n;
        self
    }
    pub fn with_init_retries(mut self, n: usize) -> Self {
        self.init_retries = n;
        self
    }
    pub fn with_response_retries(mut self, n: usize) -> Self {
        self.response_retries = n;
        self
    }
    pub fn with_speed_up(mut self, clock_hz: u32) -> Self {
        self.speed_up_hz = Some(clock_hz);
        self
    }
    pub fn no_speed_up(mut self) -> Self {
        self.speed_up_hz = None;
        self
    }
}

/// What bring-up found out about the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardInfo {
    pub version: CardVersion,
    pub capacity: CapacityClass,
    /// OCR read during negotiation.
    pub ocr: u32,
    /// Initialization rounds used (APP_CMD + SD_SEND_OP_COND pairs).
    pub init_rounds: usize,
    pub clock_hz: Option<u32>,
}

/// One card behind one transport.
///
/// Created unpowered; [`bring_up`](Self::bring_up) runs the sequence once.
#[derive(Debug)]
pub struct CardSession<T: CardTransport> {
    transport: T,
    state: CardState,
    info: Option<CardInfo>,
    response_retries: usize,
}

impl<T: CardTransport> CardSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: CardState::Unpowered,
            info: None,
            response_retries: DEFAULT_RESPONSE_RETRIES,
        }
    }

    /// Creates a session and brings the card up.
    pub fn open(transport: T, config: &BringUpConfig) -> InitResult<Self> {
        let mut session = Self::new(transport);
        session.bring_up(config)?;
        Ok(session)
    }

    #[inline]
    pub fn state(&self) -> CardState {
        self.state
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == CardState::Ready
    }

    #[inline]
    pub fn info(&self) -> Option<&CardInfo> {
        self.info.as_ref()
    }

    /// Block size resolved by bring-up; 0 until ready.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.info.map(|i| i.capacity.block_size()).unwrap_or(0)
    }

    #[inline]
    pub fn response_retries(&self) -> usize {
        self.response_retries
    }

    #[inline]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[inline]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Runs the whole bring-up sequence, then the optional speed-up.
    ///
    /// Any failure leaves the session `Failed`.
    pub fn bring_up(&mut self, config: &BringUpConfig) -> InitResult<CardInfo> {
        if self.state != CardState::Unpowered {
            return Err(InitError::InvalidState(self.state));
        }
        self.response_retries = config.response_retries;

        let info = match self.run_bring_up(config) {
            Ok(info) => info,
            Err(e) => {
                log::debug!("bring-up failed in {:?}: {}", self.state, e.msg());
                self.enter(CardState::Failed);
                return Err(e);
            }
        };
        self.info = Some(info);
        self.enter(CardState::Ready);
        log::info!(
            "card ready: {:?}, {:?} capacity, {} byte blocks",
            info.version,
            info.capacity,
            info.capacity.block_size()
        );

        if let Some(hz) = config.speed_up_hz {
            self.speed_up(hz)?;
        }
        Ok(self.info.unwrap_or(info))
    }

    /// Raises the transport clock once the card is ready. Runs at most once.
    ///
    /// A failure is fatal: the session ends up `Failed`.
    pub fn speed_up(&mut self, clock_hz: u32) -> InitResult {
        if self.state != CardState::Ready {
            return Err(InitError::InvalidState(self.state));
        }
        let Some(info) = self.info.as_mut() else {
            return Err(InitError::InvalidState(self.state));
        };
        if info.clock_hz.is_some() {
            return Err(InitError::InvalidState(self.state));
        }

        match self.transport.reconfigure(clock_hz) {
            Ok(()) => {
                info.clock_hz = Some(clock_hz);
                log::debug!("clock raised to {clock_hz} Hz");
                Ok(())
            }
            Err(e) => {
                self.info = None;
                self.enter(CardState::Failed);
                Err(InitError::SpeedUpFailed(e))
            }
        }
    }

    fn run_bring_up(&mut self, config: &BringUpConfig) -> InitResult<CardInfo> {
        self.transport
            .idle_clock(config.warmup_bytes)
            .map_err(CommandError::from)?;
        self.enter(CardState::WarmedUp);

        self.reset(config.reset_retries)?;
        self.enter(CardState::Reset);

        let r7: Response<R3_LEN> = self.command(Command::send_if_cond(IF_COND_ARGUMENT))?;
        let version = if r7.is_idle() && echoes_if_cond(&r7.bytes, IF_COND_ARGUMENT) {
            CardVersion::V2
        } else {
            CardVersion::Legacy
        };
        self.enter(CardState::VersionChecked);
        log::debug!("interface check answered {:02X?}: {version:?}", r7.bytes);

        let (capacity, ocr, init_rounds) = match version {
            CardVersion::V2 => {
                let rounds = self.initialize(config.init_retries)?;
                let r3: Response<R3_LEN> = self.command(Command::read_ocr(0))?;
                let ocr = r3.ocr();
                let capacity = if is_high_capacity(ocr) {
                    CapacityClass::High
                } else {
                    CapacityClass::Standard
                };
                (capacity, ocr, rounds)
            }
            CardVersion::Legacy => {
                let r3: Response<R3_LEN> = self.command(Command::read_ocr(0))?;
                if !r3.is_idle() {
                    return Err(InitError::VoltageRejected { status: r3.r1() });
                }
                let ocr = r3.ocr();
                if !has_acceptable_voltage(ocr) {
                    log::warn!("card voltage window not acceptable (OCR {ocr:#010X}), continuing");
                }
                let rounds = self.initialize(config.init_retries)?;
                (CapacityClass::Standard, ocr, rounds)
            }
        };
        self.enter(CardState::VoltageNegotiated);

        Ok(CardInfo {
            version,
            capacity,
            ocr,
            init_rounds,
            clock_hz: None,
        })
    }

    /// GO_IDLE_STATE once, then poll single bytes for an idle R1.
    fn reset(&mut self, retries: usize) -> InitResult {
        self.transport.send_command(Command::go_idle_state(0))?;
        let polled = retry(retries, |_| -> TransportResult<Option<()>> {
            let mut byte = [FILLER];
            self.transport.exchange(&mut byte)?;
            Ok(is_idle(&byte).then_some(()))
        })
        .map_err(CommandError::from)?;

        match polled {
            Retried::Done { attempts, .. } => {
                log::debug!("card idle after {attempts} polls");
                Ok(())
            }
            Retried::Exhausted { .. } => Err(InitError::ResetTimeout),
        }
    }

    /// APP_CMD + SD_SEND_OP_COND until the card leaves idle. Every round counts.
    fn initialize(&mut self, retries: usize) -> InitResult<usize> {
        let polled = retry(retries, |round| -> CommandResult<Option<()>> {
            let app: Response<1> = self.command(Command::app_cmd(0))?;
            if !app.is_idle() {
                log::debug!("APP_CMD answered {:#04X} in round {round}", app.r1());
                return Ok(None);
            }
            let op: Response<1> = self.command(Command::sd_send_op_cond(HCS_ARGUMENT))?;
            if op.is_idle() || !is_valid_r1(op.r1()) {
                return Ok(None);
            }
            Ok(Some(()))
        })?;

        match polled {
            Retried::Done { attempts, .. } => Ok(attempts),
            Retried::Exhausted { .. } => Err(InitError::InitTimeout),
        }
    }

    pub(crate) fn command<const N: usize>(
        &mut self,
        command: Command,
    ) -> CommandResult<Response<N>> {
        self.transport.command(command, self.response_retries)
    }

    fn enter(&mut self, state: CardState) {
        log::debug!("{:?} -> {:?}", self.state, state);
        self.state = state;
    }
}
