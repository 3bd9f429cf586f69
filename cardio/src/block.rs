// SPDX-License-Identifier: MIT

//! Single block reads and unaligned byte range reads stitched over them.

#[cfg(feature = "alloc")]
use alloc::{vec, vec::Vec};

use crate::card::CardSession;
use crate::command::Command;
use crate::errors::*;
use crate::response::{DATA_START_TOKEN, Response};
use crate::{CardTransport, FILLER};

/// Largest block any source may use; sizes the stack scratch buffer.
pub const MAX_BLOCK_SIZE: usize = 512;
/// Start token before the payload plus 2 checksum bytes after it.
pub const BLOCK_TRAILER_LEN: usize = 3;
/// Block index to byte address.
pub const BLOCK_ADDRESS_SHIFT: u32 = 9;

/// Anything that hands out fixed-size blocks by index.
pub trait BlockSource {
    /// Bytes per block; 0 when the source can't read yet.
    fn block_size(&self) -> usize;

    /// Reads block `index` into `out`, which must be exactly one block long.
    fn read_block(&mut self, index: u32, out: &mut [u8]) -> BlockResult;
}

impl<T: BlockSource + ?Sized> BlockSource for &mut T {
    #[inline]
    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    #[inline]
    fn read_block(&mut self, index: u32, out: &mut [u8]) -> BlockResult {
        (**self).read_block(index, out)
    }
}

/// Byte-addressed helpers for every [`BlockSource`].
pub trait BlockSourceExt: BlockSource {
    /// Fills `dest` with the bytes starting at byte `address`.
    ///
    /// The first block is copied from the intra-block offset, interior blocks
    /// whole, the last one only up to the bytes still missing.
    fn read_bytes(&mut self, dest: &mut [u8], address: u64) -> BlockResult {
        let block_size = self.block_size();
        if block_size == 0 {
            return Err(BlockError::NotReady);
        }
        if block_size > MAX_BLOCK_SIZE {
            return Err(BlockError::Other("block size exceeds scratch buffer"));
        }
        if dest.is_empty() {
            return Ok(());
        }

        let bs = block_size as u64;
        let first = address / bs;
        let end = address
            .checked_add(dest.len() as u64 - 1)
            .ok_or(BlockError::AddressOverflow { block: u64::MAX })?;
        let last = end / bs;
        if last > u32::MAX as u64 {
            return Err(BlockError::AddressOverflow { block: last });
        }

        let mut scratch = [0u8; MAX_BLOCK_SIZE];
        let scratch = &mut scratch[..block_size];
        let mut offset = (address % bs) as usize;
        let mut copied = 0;

        for index in first..=last {
            self.read_block(index as u32, scratch)?;
            let take = (block_size - offset).min(dest.len() - copied);
            dest[copied..copied + take].copy_from_slice(&scratch[offset..offset + take]);
            copied += take;
            offset = 0;
        }

        debug_assert_eq!(copied, dest.len());
        Ok(())
    }

    /// Reads one block into a fresh buffer.
    #[cfg(feature = "alloc")]
    fn read_block_vec(&mut self, index: u32) -> BlockResult<Vec<u8>> {
        let mut buf = vec![0u8; self.block_size()];
        self.read_block(index, &mut buf)?;
        Ok(buf)
    }

    /// Reads `len` bytes at `address` into a fresh buffer.
    #[cfg(feature = "alloc")]
    fn read_bytes_vec(&mut self, address: u64, len: usize) -> BlockResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_bytes(&mut buf, address)?;
        Ok(buf)
    }
}

impl<T: BlockSource + ?Sized> BlockSourceExt for T {}

impl<T: CardTransport> CardSession<T> {
    /// READ_SINGLE_BLOCK at `lba << 9`.
    ///
    /// The status byte must be zero and the payload must follow the start
    /// token directly. The trailing checksum is read but not checked.
    pub fn read_block(&mut self, lba: u32, out: &mut [u8]) -> BlockResult {
        if !self.is_ready() {
            return Err(BlockError::NotReady);
        }
        let block_size = self.block_size();
        if out.len() != block_size {
            return Err(BlockError::BufferSize {
                expected: block_size,
                found: out.len(),
            });
        }

        let address = u32::try_from((lba as u64) << BLOCK_ADDRESS_SHIFT)
            .map_err(|_| BlockError::AddressOverflow { block: lba as u64 })?;
        let in_block = |source: CommandError| BlockError::Command { block: lba, source };

        let status: Response<1> = self
            .command(Command::read_single_block(address))
            .map_err(in_block)?;
        if status.r1() != 0x00 {
            return Err(BlockError::ReadRejected {
                block: lba,
                status: status.r1(),
            });
        }

        let mut frame = [FILLER; MAX_BLOCK_SIZE + BLOCK_TRAILER_LEN];
        let frame = &mut frame[..block_size + BLOCK_TRAILER_LEN];
        self.transport_mut()
            .exchange(frame)
            .map_err(|e| in_block(e.into()))?;

        if frame[0] != DATA_START_TOKEN {
            return Err(BlockError::BadStartToken {
                block: lba,
                token: frame[0],
            });
        }
        out.copy_from_slice(&frame[1..=block_size]);
        log::trace!("block {lba} read ({block_size} bytes)");
        Ok(())
    }
}

impl<T: CardTransport> BlockSource for CardSession<T> {
    #[inline]
    fn block_size(&self) -> usize {
        CardSession::block_size(self)
    }

    #[inline]
    fn read_block(&mut self, index: u32, out: &mut [u8]) -> BlockResult {
        CardSession::read_block(self, index, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic blocks computed from their index.
    struct PatternBlocks {
        block_size: usize,
        reads: Vec<u32>,
    }

    impl PatternBlocks {
        fn new(block_size: usize) -> Self {
            Self {
                block_size,
                reads: Vec::new(),
            }
        }

        fn byte(block: u32, i: usize) -> u8 {
            (block.wrapping_mul(31) as usize ^ i.wrapping_mul(7) ^ (i >> 3)) as u8
        }

        fn block(&self, index: u32) -> Vec<u8> {
            (0..self.block_size).map(|i| Self::byte(index, i)).collect()
        }
    }

    impl BlockSource for PatternBlocks {
        fn block_size(&self) -> usize {
            self.block_size
        }

        fn read_block(&mut self, index: u32, out: &mut [u8]) -> BlockResult {
            assert_eq!(out.len(), self.block_size);
            self.reads.push(index);
            for (i, b) in out.iter_mut().enumerate() {
                *b = Self::byte(index, i);
            }
            Ok(())
        }
    }

    fn expected(src: &PatternBlocks, address: u64, size: usize) -> Vec<u8> {
        let bs = src.block_size as u64;
        let first = address / bs;
        let blocks = (address % bs + size as u64).div_ceil(bs).max(1);
        let joined: Vec<u8> = (first..first + blocks)
            .flat_map(|k| src.block(k as u32))
            .collect();
        let o = (address % bs) as usize;
        joined[o..o + size].to_vec()
    }

    fn check(src: &mut PatternBlocks, address: u64, size: usize) {
        src.reads.clear();
        let mut dest = vec![0xAAu8; size];
        src.read_bytes(&mut dest, address).unwrap();
        assert_eq!(
            dest,
            expected(src, address, size),
            "bs={} address={address} size={size}",
            src.block_size
        );

        let bs = src.block_size as u64;
        let touched = if size == 0 {
            0
        } else {
            ((address + size as u64 - 1) / bs - address / bs + 1) as usize
        };
        assert_eq!(src.reads.len(), touched, "blocks read for {address}+{size}");
    }

    #[test]
    fn read_bytes_matches_sliced_concatenation_small_blocks() {
        for bs in [8usize, 16, 32] {
            let mut src = PatternBlocks::new(bs);
            for k in 0..4u64 {
                for o in 0..bs as u64 {
                    for size in 0..=3 * bs + 2 {
                        check(&mut src, k * bs as u64 + o, size);
                    }
                }
            }
        }
    }

    #[test]
    fn read_bytes_matches_sliced_concatenation_card_blocks() {
        for bs in [256usize, 512] {
            let mut src = PatternBlocks::new(bs);
            let sizes = [1, 2, bs - 1, bs, bs + 1, 2 * bs - 1, 2 * bs, 2 * bs + 1, 3 * bs + 7];
            for k in [0u64, 1, 7] {
                for o in (0..bs as u64).step_by(37).chain([bs as u64 - 1]) {
                    for &size in &sizes {
                        check(&mut src, k * bs as u64 + o, size);
                    }
                }
            }
        }
    }

    #[test]
    fn read_bytes_reads_exactly_the_spanned_blocks() {
        let mut src = PatternBlocks::new(512);
        let mut dest = [0u8; 4];
        src.read_bytes(&mut dest, 510).unwrap();
        assert_eq!(src.reads, [0, 1]);
        assert_eq!(dest[..2], src.block(0)[510..]);
        assert_eq!(dest[2..], src.block(1)[..2]);
    }

    #[test]
    fn read_bytes_rejects_unready_source() {
        let mut src = PatternBlocks::new(0);
        let mut dest = [0u8; 4];
        assert_eq!(src.read_bytes(&mut dest, 0), Err(BlockError::NotReady));
    }

    #[test]
    fn read_bytes_rejects_addresses_past_the_last_block() {
        let mut src = PatternBlocks::new(512);
        let mut dest = [0u8; 1];
        let err = src.read_bytes(&mut dest, (u32::MAX as u64 + 1) * 512).unwrap_err();
        assert!(matches!(err, BlockError::AddressOverflow { .. }));
    }

    #[test]
    fn read_bytes_rejects_ranges_past_the_address_space() {
        let mut src = PatternBlocks::new(512);
        let mut dest = [0u8; 4];
        let err = src.read_bytes(&mut dest, u64::MAX - 1).unwrap_err();
        assert_eq!(err, BlockError::AddressOverflow { block: u64::MAX });
        assert!(src.reads.is_empty());
    }

    #[cfg(feature = "mem")]
    mod card {
        use super::*;
        use crate::card::{BringUpConfig, CardSession};
        use crate::mem::{CardProfile, MemCard};

        fn image(len: usize) -> Vec<u8> {
            (0..len).map(|i| (i % 251) as u8).collect()
        }

        fn session(profile: CardProfile) -> CardSession<MemCard> {
            CardSession::open(MemCard::new(image(16 * 1024), profile), &BringUpConfig::default())
                .unwrap()
        }

        #[test]
        fn reads_the_block_at_lba_times_512() {
            let mut s = session(CardProfile::sdhc());
            let mut block = [0u8; 512];
            s.read_block(3, &mut block).unwrap();
            assert_eq!(block.as_slice(), &image(16 * 1024)[3 * 512..4 * 512]);
        }

        #[test]
        fn standard_card_reads_256_bytes_at_the_shifted_address() {
            let mut s = session(CardProfile::sdsc_v2());
            let mut block = [0u8; 256];
            s.read_block(2, &mut block).unwrap();
            assert_eq!(block.as_slice(), &image(16 * 1024)[1024..1024 + 256]);
        }

        #[test]
        fn read_bytes_over_the_card() {
            let mut s = session(CardProfile::sdhc());
            let data = s.read_bytes_vec(1000, 1500).unwrap();
            assert_eq!(data.as_slice(), &image(16 * 1024)[1000..2500]);
        }

        #[test]
        fn unready_session_refuses_reads() {
            let mut s = CardSession::new(MemCard::new(image(4096), CardProfile::sdhc()));
            let mut block = [0u8; 512];
            assert_eq!(s.read_block(0, &mut block), Err(BlockError::NotReady));
        }

        #[test]
        fn buffer_must_be_one_block() {
            let mut s = session(CardProfile::sdhc());
            let mut block = [0u8; 256];
            assert_eq!(
                s.read_block(0, &mut block),
                Err(BlockError::BufferSize {
                    expected: 512,
                    found: 256
                })
            );
        }

        #[test]
        fn out_of_range_read_is_rejected_with_status() {
            let mut s = session(CardProfile::sdhc());
            let mut block = [0u8; 512];
            let err = s.read_block(1000, &mut block).unwrap_err();
            assert!(matches!(err, BlockError::ReadRejected { block: 1000, status } if status != 0));
        }

        #[test]
        fn wrong_start_token_is_reported_with_the_byte() {
            let mut s = session(CardProfile::sdhc().with_start_token(0xFC));
            let mut block = [0u8; 512];
            assert_eq!(
                s.read_block(1, &mut block),
                Err(BlockError::BadStartToken {
                    block: 1,
                    token: 0xFC
                })
            );
        }

        #[test]
        fn high_lba_overflows_the_byte_address() {
            let mut s = session(CardProfile::sdhc());
            let mut block = [0u8; 512];
            assert_eq!(
                s.read_block(1 << 23, &mut block),
                Err(BlockError::AddressOverflow { block: 1 << 23 })
            );
        }

        #[test]
        fn errors_from_read_bytes_carry_the_failing_block() {
            let mut s = session(CardProfile::sdhc());
            let mut dest = vec![0u8; 1024];
            let err = s.read_bytes(&mut dest, 31 * 512).unwrap_err();
            assert_eq!(err.block(), Some(32));
        }
    }
}
