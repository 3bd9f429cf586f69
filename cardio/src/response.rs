// SPDX-License-Identifier: MIT

//! Response shapes and pure decoders over them.

bitflags::bitflags! {
    /// R1 status byte. Bit 7 is always clear in a valid response.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct R1Status: u8 {
        const IDLE                 = 0x01;
        const ERASE_RESET          = 0x02;
        const ILLEGAL_COMMAND      = 0x04;
        const CRC_ERROR            = 0x08;
        const ERASE_SEQUENCE_ERROR = 0x10;
        const ADDRESS_ERROR        = 0x20;
        const PARAMETER_ERROR      = 0x40;
    }
}

/// Length of an R3/R7 response.
pub const R3_LEN: usize = 5;

/// OCR bits 15..=23: supported voltage window.
pub const OCR_VOLTAGE_WINDOW: u32 = 0x00FF_8000;
/// OCR bit 30: card capacity status.
pub const OCR_CCS: u32 = 1 << 30;
/// OCR bit 31: power-up complete (low while busy).
pub const OCR_POWER_UP: u32 = 1 << 31;

/// Token that precedes a data block.
pub const DATA_START_TOKEN: u8 = 0xFE;

/// Bytes read back for a command, plus the polls it took to see the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response<const N: usize> {
    pub bytes: [u8; N],
    pub attempts: usize,
}

impl<const N: usize> Response<N> {
    #[inline]
    pub fn r1(&self) -> u8 {
        self.bytes[0]
    }

    #[inline]
    pub fn status(&self) -> R1Status {
        R1Status::from_bits_truncate(self.bytes[0])
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        is_idle(&self.bytes)
    }
}

impl Response<R3_LEN> {
    #[inline]
    pub fn ocr(&self) -> u32 {
        extract_ocr(&self.bytes)
    }
}

/// `true` when the leading R1 is valid and has the idle bit set.
#[inline]
pub fn is_idle(response: &[u8]) -> bool {
    match response.first() {
        Some(&r1) => is_valid_r1(r1) && r1 & R1Status::IDLE.bits() != 0,
        None => false,
    }
}

#[inline]
pub fn is_valid_r1(r1: u8) -> bool {
    r1 & 0x80 == 0
}

/// OCR from bytes 1..=4 of an R3/R7 response, big-endian.
#[inline]
pub fn extract_ocr(response: &[u8; R3_LEN]) -> u32 {
    u32::from_be_bytes([response[1], response[2], response[3], response[4]])
}

/// Any bit of the voltage window set.
#[inline]
pub fn has_acceptable_voltage(ocr: u32) -> bool {
    ocr & OCR_VOLTAGE_WINDOW != 0
}

#[inline]
pub fn is_high_capacity(ocr: u32) -> bool {
    ocr & OCR_CCS != 0
}

#[inline]
pub fn is_powered_up(ocr: u32) -> bool {
    ocr & OCR_POWER_UP != 0
}

/// R7 echoes the requested voltage nibble and check pattern.
#[inline]
pub fn echoes_if_cond(response: &[u8; R3_LEN], argument: u32) -> bool {
    response[3] & 0x0F == ((argument >> 8) & 0x0F) as u8 && response[4] == argument as u8
}
