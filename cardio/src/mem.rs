// SPDX-License-Identifier: MIT

//! In-memory card emulator.
//!
//! Speaks the SPI-mode command set over a byte image so the bring-up and the
//! block path can run without hardware. Useful for tests, image inspection,
//! replaying dumps.

use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;

use crate::command::*;
use crate::errors::*;
use crate::response::*;
use crate::{CardTransport, FILLER};

/// Clocks a card needs with CS high before it listens.
pub const MIN_WARMUP_CLOCKS: u64 = 74;

/// Random access storage behind an emulated card.
pub trait CardImage {
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads `buf.len()` bytes at byte `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> TransportResult;
}

#[inline]
fn slice_read(data: &[u8], offset: u64, buf: &mut [u8]) -> TransportResult {
    let start = usize::try_from(offset).map_err(|_| TransportError::OutOfBounds)?;
    let end = start
        .checked_add(buf.len())
        .ok_or(TransportError::OutOfBounds)?;
    let src = data.get(start..end).ok_or(TransportError::OutOfBounds)?;
    buf.copy_from_slice(src);
    Ok(())
}

impl CardImage for Vec<u8> {
    #[inline]
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    #[inline]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> TransportResult {
        slice_read(self.as_slice(), offset, buf)
    }
}

impl CardImage for &[u8] {
    #[inline]
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    #[inline]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> TransportResult {
        slice_read(*self, offset, buf)
    }
}

impl<T: CardImage + ?Sized> CardImage for &mut T {
    #[inline]
    fn len(&self) -> u64 {
        (**self).len()
    }

    #[inline]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> TransportResult {
        (**self).read_at(offset, buf)
    }
}

/// How an emulated card behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardProfile {
    /// Answers the interface check with an echo.
    pub v2: bool,
    /// Sets CCS once initialized; blocks are 512 bytes instead of 256.
    pub high_capacity: bool,
    pub voltage_window: u32,
    /// SD_SEND_OP_COND answers still idle this many times after a reset.
    pub busy_polls: usize,
    /// Filler bytes between a command frame and its response.
    pub response_delay: usize,
    pub start_token: u8,
    /// READ_OCR answers a bare illegal command status.
    pub ocr_rejected: bool,
    /// The clock can't be changed.
    pub fixed_clock: bool,
    /// SEND_IF_COND is never answered.
    pub silent_if_cond: bool,
}

impl Default for CardProfile {
    fn default() -> Self {
        Self::sdhc()
    }
}

impl CardProfile {
    /// Version 2 card, high capacity.
    pub const fn sdhc() -> Self {
        Self {
            v2: true,
            high_capacity: true,
            voltage_window: OCR_VOLTAGE_WINDOW,
            busy_polls: 0,
            response_delay: 1,
            start_token: DATA_START_TOKEN,
            ocr_rejected: false,
            fixed_clock: false,
            silent_if_cond: false,
        }
    }

    /// Version 2 card, standard capacity.
    pub const fn sdsc_v2() -> Self {
        Self {
            high_capacity: false,
            ..Self::sdhc()
        }
    }

    /// Card that predates the interface check.
    pub const fn legacy() -> Self {
        Self {
            v2: false,
            high_capacity: false,
            ..Self::sdhc()
        }
    }

    pub const fn with_voltage_window(mut self, window: u32) -> Self {
        self.voltage_window = window;
        self
    }
    pub const fn with_busy_polls(mut self, n: usize) -> Self {
        self.busy_polls = n;
        self
    }
    pub const fn with_response_delay(mut self, n: usize) -> Self {
        self.response_delay = n;
        self
    }
    pub const fn with_start_token(mut self, token: u8) -> Self {
        self.start_token = token;
        self
    }
    pub const fn with_ocr_rejected(mut self) -> Self {
        self.ocr_rejected = true;
        self
    }
    pub const fn with_fixed_clock(mut self) -> Self {
        self.fixed_clock = true;
        self
    }
    pub const fn with_silent_if_cond(mut self) -> Self {
        self.silent_if_cond = true;
        self
    }

    /// Bytes returned per READ_SINGLE_BLOCK.
    #[inline]
    pub const fn block_len(&self) -> usize {
        if self.high_capacity { 512 } else { 256 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Powered, not yet in SPI mode.
    Native,
    Idle,
    Ready,
}

/// Emulated card over a [`CardImage`].
///
/// Responses are queued after a full frame is clocked in and clocked out on
/// the following bytes, so a response never overlaps its own command.
#[derive(Debug)]
pub struct MemCard<I: CardImage = Vec<u8>> {
    image: I,
    profile: CardProfile,
    mode: Mode,
    idle_clocks: u64,
    frame: [u8; COMMAND_LEN],
    frame_len: usize,
    pending: VecDeque<u8>,
    app_command: bool,
    busy_left: usize,
    clock_hz: Option<u32>,
}

impl<I: CardImage> MemCard<I> {
    pub fn new(image: I, profile: CardProfile) -> Self {
        Self {
            image,
            profile,
            mode: Mode::Native,
            idle_clocks: 0,
            frame: [0; COMMAND_LEN],
            frame_len: 0,
            pending: VecDeque::new(),
            app_command: false,
            busy_left: profile.busy_polls,
            clock_hz: None,
        }
    }

    #[inline]
    pub fn profile(&self) -> &CardProfile {
        &self.profile
    }

    /// Clock set by the host, if it asked for one.
    #[inline]
    pub fn clock_hz(&self) -> Option<u32> {
        self.clock_hz
    }

    /// Finished initialization.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.mode == Mode::Ready
    }

    #[inline]
    pub fn image(&self) -> &I {
        &self.image
    }

    #[inline]
    pub fn into_image(self) -> I {
        self.image
    }

    fn r1(&self) -> u8 {
        match self.mode {
            Mode::Ready => 0x00,
            _ => R1Status::IDLE.bits(),
        }
    }

    fn clock_in(&mut self, byte: u8) -> TransportResult {
        if self.frame_len == 0 && byte & 0xC0 != COMMAND_PREFIX {
            return Ok(());
        }
        self.frame[self.frame_len] = byte;
        self.frame_len += 1;
        if self.frame_len == COMMAND_LEN {
            self.frame_len = 0;
            let frame = self.frame;
            self.handle(frame)?;
        }
        Ok(())
    }

    fn reply(&mut self, bytes: &[u8]) {
        self.pending
            .extend(core::iter::repeat_n(FILLER, self.profile.response_delay));
        self.pending.extend(bytes.iter().copied());
    }

    fn handle(&mut self, frame: [u8; COMMAND_LEN]) -> TransportResult {
        let opcode = frame[0] & 0x3F;
        let argument = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]);
        let checksum_ok = frame[5] == fixed_checksum(opcode);
        let app = core::mem::take(&mut self.app_command);
        self.pending.clear();

        if self.mode == Mode::Native
            && (opcode != GO_IDLE_STATE || !checksum_ok || self.idle_clocks < MIN_WARMUP_CLOCKS)
        {
            log::trace!("emulated card ignores CMD{opcode} before entering SPI mode");
            return Ok(());
        }

        if matches!(opcode, GO_IDLE_STATE | SEND_IF_COND) && !checksum_ok {
            self.reply(&[self.r1() | R1Status::CRC_ERROR.bits()]);
            return Ok(());
        }

        let illegal = self.r1() | R1Status::ILLEGAL_COMMAND.bits();
        match opcode {
            GO_IDLE_STATE => {
                self.mode = Mode::Idle;
                self.busy_left = self.profile.busy_polls;
                self.reply(&[R1Status::IDLE.bits()]);
            }
            SEND_IF_COND => {
                if self.profile.silent_if_cond {
                    return Ok(());
                }
                if !self.profile.v2 {
                    self.reply(&[illegal]);
                    return Ok(());
                }
                let arg = argument.to_be_bytes();
                self.reply(&[self.r1(), 0x00, 0x00, arg[2] & 0x0F, arg[3]]);
            }
            APP_CMD => {
                self.app_command = true;
                self.reply(&[self.r1()]);
            }
            SD_SEND_OP_COND if app => {
                if self.mode == Mode::Idle {
                    if self.busy_left > 0 {
                        self.busy_left -= 1;
                    } else {
                        self.mode = Mode::Ready;
                    }
                }
                self.reply(&[self.r1()]);
            }
            READ_OCR => {
                if self.profile.ocr_rejected {
                    self.reply(&[R1Status::ILLEGAL_COMMAND.bits()]);
                    return Ok(());
                }
                let ocr = self.ocr().to_be_bytes();
                self.reply(&[self.r1(), ocr[0], ocr[1], ocr[2], ocr[3]]);
            }
            READ_SINGLE_BLOCK if self.mode == Mode::Ready => self.read_block(argument)?,
            _ => self.reply(&[illegal]),
        }
        Ok(())
    }

    fn ocr(&self) -> u32 {
        let mut ocr = self.profile.voltage_window & OCR_VOLTAGE_WINDOW;
        if self.mode == Mode::Ready {
            ocr |= OCR_POWER_UP;
            if self.profile.high_capacity {
                ocr |= OCR_CCS;
            }
        }
        ocr
    }

    fn read_block(&mut self, address: u32) -> TransportResult {
        let len = self.profile.block_len();
        let end = address as u64 + len as u64;
        if end > self.image.len() {
            self.reply(&[R1Status::ADDRESS_ERROR.bits()]);
            return Ok(());
        }

        let mut data = vec![0u8; len];
        self.image.read_at(address as u64, &mut data)?;
        self.reply(&[0x00]);
        self.pending.push_back(self.profile.start_token);
        self.pending.extend(data.iter().copied());
        self.pending.extend(crc16(&data).to_be_bytes());
        Ok(())
    }
}

impl<I: CardImage> CardTransport for MemCard<I> {
    fn exchange(&mut self, buf: &mut [u8]) -> TransportResult {
        for byte in buf.iter_mut() {
            let out = self.pending.pop_front().unwrap_or(FILLER);
            self.clock_in(*byte)?;
            *byte = out;
        }
        Ok(())
    }

    fn idle_clock(&mut self, n_bytes: usize) -> TransportResult {
        self.frame_len = 0;
        self.pending.clear();
        self.idle_clocks = self.idle_clocks.saturating_add(n_bytes as u64 * 8);
        Ok(())
    }

    fn reconfigure(&mut self, clock_hz: u32) -> TransportResult {
        if self.profile.fixed_clock {
            return Err(TransportError::Unsupported);
        }
        self.clock_hz = Some(clock_hz);
        Ok(())
    }
}

/// CRC-16/XMODEM, as carried after a data block.
fn crc16(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

#[cfg(test)]
mod test {
    use super::*;

    fn warm(profile: CardProfile) -> MemCard {
        let mut card = MemCard::new(vec![0u8; 4096], profile);
        card.idle_clock(10).unwrap();
        card
    }

    #[test]
    fn crc16_check_value() {
        assert_eq!(crc16(b"123456789"), 0x31C3);
    }

    #[test]
    fn cold_card_ignores_reset() {
        let mut card = MemCard::new(vec![0u8; 512], CardProfile::sdhc());
        card.idle_clock(9).unwrap();
        let err = card.command::<1>(Command::go_idle_state(0), 8).unwrap_err();
        assert_eq!(err, CommandError::NoResponse { opcode: GO_IDLE_STATE });
    }

    #[test]
    fn reset_answers_idle_after_the_delay() {
        let mut card = warm(CardProfile::sdhc().with_response_delay(2));
        let resp: Response<1> = card.command(Command::go_idle_state(0), 5).unwrap();
        assert_eq!(resp.r1(), 0x01);
        assert_eq!(resp.attempts, 3);
    }

    #[test]
    fn bad_checksum_is_flagged() {
        let mut card = warm(CardProfile::sdhc());
        card.command::<1>(Command::go_idle_state(0), 5).unwrap();

        let mut frame = Command::send_if_cond(IF_COND_ARGUMENT).encode();
        frame[5] = 0x01;
        card.exchange(&mut frame).unwrap();
        let resp = card.read_response::<1>(SEND_IF_COND).unwrap();
        assert!(resp.status().contains(R1Status::CRC_ERROR));
    }

    #[test]
    fn if_cond_is_echoed_by_v2_cards() {
        let mut card = warm(CardProfile::sdsc_v2());
        card.command::<1>(Command::go_idle_state(0), 5).unwrap();
        let resp: Response<5> = card.command(Command::send_if_cond(IF_COND_ARGUMENT), 5).unwrap();
        assert_eq!(resp.bytes, [0x01, 0x00, 0x00, 0x01, 0xAA]);
    }

    #[test]
    fn legacy_cards_reject_if_cond() {
        let mut card = warm(CardProfile::legacy());
        card.command::<1>(Command::go_idle_state(0), 5).unwrap();
        let resp: Response<5> = card.command(Command::send_if_cond(IF_COND_ARGUMENT), 5).unwrap();
        assert!(resp.status().contains(R1Status::ILLEGAL_COMMAND));
        assert_eq!(&resp.bytes[1..], &[FILLER; 4]);
    }

    #[test]
    fn op_cond_needs_app_prefix() {
        let mut card = warm(CardProfile::sdhc());
        card.command::<1>(Command::go_idle_state(0), 5).unwrap();
        let resp: Response<1> = card.command(Command::sd_send_op_cond(HCS_ARGUMENT), 5).unwrap();
        assert!(resp.status().contains(R1Status::ILLEGAL_COMMAND));
        assert!(!card.is_initialized());

        card.command::<1>(Command::app_cmd(0), 5).unwrap();
        let resp: Response<1> = card.command(Command::sd_send_op_cond(HCS_ARGUMENT), 5).unwrap();
        assert_eq!(resp.r1(), 0x00);
        assert!(card.is_initialized());
    }

    #[test]
    fn ocr_reports_capacity_only_after_init() {
        let mut card = warm(CardProfile::sdhc());
        card.command::<1>(Command::go_idle_state(0), 5).unwrap();
        let before: Response<5> = card.command(Command::read_ocr(0), 5).unwrap();
        assert!(!is_high_capacity(before.ocr()));
        assert!(!is_powered_up(before.ocr()));

        card.command::<1>(Command::app_cmd(0), 5).unwrap();
        card.command::<1>(Command::sd_send_op_cond(HCS_ARGUMENT), 5).unwrap();
        let after: Response<5> = card.command(Command::read_ocr(0), 5).unwrap();
        assert!(is_high_capacity(after.ocr()));
        assert!(is_powered_up(after.ocr()));
        assert!(has_acceptable_voltage(after.ocr()));
    }

    #[test]
    fn block_reads_need_an_initialized_card() {
        let mut card = warm(CardProfile::sdhc());
        card.command::<1>(Command::go_idle_state(0), 5).unwrap();
        let resp: Response<1> = card.command(Command::read_single_block(0), 5).unwrap();
        assert!(resp.status().contains(R1Status::ILLEGAL_COMMAND));
    }

    #[test]
    fn block_frame_carries_token_payload_and_crc() {
        let image: Vec<u8> = (0..2048).map(|i| (i / 7) as u8).collect();
        let mut card = MemCard::new(image.clone(), CardProfile::sdhc());
        card.idle_clock(10).unwrap();
        card.command::<1>(Command::go_idle_state(0), 5).unwrap();
        card.command::<1>(Command::app_cmd(0), 5).unwrap();
        card.command::<1>(Command::sd_send_op_cond(HCS_ARGUMENT), 5).unwrap();

        let resp: Response<1> = card.command(Command::read_single_block(512), 5).unwrap();
        assert_eq!(resp.r1(), 0x00);
        let mut frame = [FILLER; 515];
        card.exchange(&mut frame).unwrap();
        assert_eq!(frame[0], DATA_START_TOKEN);
        assert_eq!(&frame[1..513], &image[512..1024]);
        assert_eq!(u16::from_be_bytes([frame[513], frame[514]]), crc16(&image[512..1024]));
    }

    #[test]
    fn reconfigure_is_recorded() {
        let mut card = warm(CardProfile::sdhc());
        card.reconfigure(400_000).unwrap();
        assert_eq!(card.clock_hz(), Some(400_000));

        let mut fixed = warm(CardProfile::sdhc().with_fixed_clock());
        assert_eq!(fixed.reconfigure(400_000), Err(TransportError::Unsupported));
    }

    #[test]
    fn borrowed_images_work() {
        let data = [7u8; 1024];
        let mut img: &[u8] = &data;
        let mut buf = [0u8; 4];
        img.read_at(1020, &mut buf).unwrap();
        assert_eq!(buf, [7; 4]);
        assert_eq!(img.read_at(1021, &mut buf), Err(TransportError::OutOfBounds));
    }
}
