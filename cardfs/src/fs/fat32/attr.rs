// SPDX-License-Identifier: MIT

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Fat32Attributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN    = 0x02;
        const SYSTEM    = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE   = 0x20;
        const LFN       = 0x0F;
    }
}

impl Fat32Attributes {
    /// Long-name slots carry all four low bits.
    #[inline]
    pub fn is_lfn(&self) -> bool {
        self.contains(Fat32Attributes::LFN)
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        !self.is_lfn() && self.contains(Fat32Attributes::DIRECTORY)
    }

    #[inline]
    pub fn is_volume_label(&self) -> bool {
        !self.is_lfn() && self.contains(Fat32Attributes::VOLUME_ID)
    }

    /// `ls -l` style flags, e.g. `d----` or `-rhsa`.
    pub fn flags(&self) -> [char; 5] {
        let pick = |flag: Fat32Attributes, c: char| if self.contains(flag) { c } else { '-' };
        [
            pick(Fat32Attributes::DIRECTORY, 'd'),
            pick(Fat32Attributes::READ_ONLY, 'r'),
            pick(Fat32Attributes::HIDDEN, 'h'),
            pick(Fat32Attributes::SYSTEM, 's'),
            pick(Fat32Attributes::ARCHIVE, 'a'),
        ]
    }
}
