// SPDX-License-Identifier: MIT
#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{string::String, vec::Vec};

use crate::fs::fat32::{constant::*, types::LongNameFragment};

/// Long names span at most 20 fragments.
pub const MAX_LFN_CHARS: usize = 255;

/// Stored in place of a leading 0xE5 in short names.
const SFN_KANJI_E5: u8 = 0x05;

#[inline]
pub(crate) fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

#[inline]
pub(crate) fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Appends one UTF-16 code unit as UTF-8 (1 to 3 bytes).
///
/// Units are taken one at a time, so surrogate halves cannot pair up and
/// are replaced by U+FFFD.
#[inline]
pub fn push_utf16_unit(out: &mut String, unit: u16) {
    out.push(char::from_u32(unit as u32).unwrap_or(char::REPLACEMENT_CHARACTER));
}

/// Converts code units until 0x0000 or 0xFFFF, whichever comes first.
pub fn utf16_to_utf8(units: &[u16], out: &mut String) {
    for &unit in units {
        if unit == LFN_TERMINATOR || unit == LFN_PADDING {
            break;
        }
        push_utf16_unit(out, unit);
    }
}

/// Reassembles a long name from fragments given in any order.
///
/// Fragments are ordered by sequence number. Each chunk stops at its own
/// terminator.
pub fn decode_lfn(fragments: &[LongNameFragment]) -> String {
    let mut ordered: Vec<&LongNameFragment> = fragments.iter().collect();
    ordered.sort_by_key(|f| f.sequence());

    let mut name = String::with_capacity(ordered.len() * LFN_UNITS_PER_ENTRY);
    for fragment in ordered {
        for chunk in fragment.chunks() {
            utf16_to_utf8(chunk, &mut name);
        }
    }
    name
}

/// Decodes an 8.3 name: base and extension right-trimmed, joined without a dot.
///
/// Bytes above 0x7F are read as Latin-1.
pub fn decode_sfn(sfn: &[u8; FAT_SFN_LEN]) -> String {
    let (base, ext) = sfn.split_at(8);
    let mut name = String::with_capacity(FAT_SFN_LEN);
    push_sfn_base(&mut name, base);
    push_latin1(&mut name, trim_spaces(ext));
    name
}

/// 8.3 name in `BASE.EXT` form, used for lookups.
pub fn sfn_dotted(sfn: &[u8; FAT_SFN_LEN]) -> String {
    let (base, ext) = sfn.split_at(8);
    let mut name = String::with_capacity(FAT_SFN_LEN + 1);
    push_sfn_base(&mut name, base);
    let ext = trim_spaces(ext);
    if !ext.is_empty() {
        name.push('.');
        push_latin1(&mut name, ext);
    }
    name
}

fn push_sfn_base(out: &mut String, base: &[u8]) {
    match trim_spaces(base) {
        [SFN_KANJI_E5, rest @ ..] => {
            out.push(char::from(FAT_ENTRY_DELETED));
            push_latin1(out, rest);
        }
        base => push_latin1(out, base),
    }
}

#[inline]
fn push_latin1(out: &mut String, bytes: &[u8]) {
    out.extend(bytes.iter().map(|&b| char::from(b)));
}

fn trim_spaces(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != b' ').map_or(0, |p| p + 1);
    &bytes[..end]
}

/// Case-insensitive comparison used for lookups.
#[inline]
pub fn name_matches(name: &str, target: &str) -> bool {
    name.eq_ignore_ascii_case(target)
}
