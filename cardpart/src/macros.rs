// SPDX-License-Identifier: MIT

#[macro_export]
/// Defines a set of MBR partition types, along with associated constants, match helpers, and an enum for partition kinds.
///
/// This macro generates:
/// - A constant `u8` for each partition type byte.
/// - A function to check if a partition record matches a given type.
/// - An enum `MbrPartitionKind` representing all defined partition types and an `Unknown` variant for unrecognized bytes.
/// - Implementations for converting between type bytes and `MbrPartitionKind`.
/// - A `Display` implementation for `MbrPartitionKind`.
///
/// # Example
/// ```rust,ignore
/// define_partition_types! {
///     FAT32_LBA => "FAT32 (LBA)", 0x0C,
///     LINUX => "Linux", 0x83,
/// }
/// ```
///
/// # Generated Items
/// For each partition type:
/// - `pub const MBR_PARTITION_TYPE_<NAME>: u8`
/// - `pub fn is_<name>_partition(record: &PartitionRecord) -> bool`
///
/// # Note
/// This macro requires the `paste` crate for identifier concatenation.
macro_rules! define_partition_types {
    (
        $(
            $name:ident => $desc:expr, $byte:expr
        ),+ $(,)?
    ) => {
        paste::paste! {
            $(
                #[doc = $desc]
                pub const [<MBR_PARTITION_TYPE_ $name:upper>]: u8 = $byte;

                #[doc = concat!("Checks if a partition record is of type: ", $desc)]
                pub fn [<is_ $name:lower _partition>](
                    record: &$crate::mbr::PartitionRecord,
                ) -> bool {
                    record.part_type == [<MBR_PARTITION_TYPE_ $name:upper>]
                }
            )+

            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            #[allow(non_camel_case_types)]
            pub enum MbrPartitionKind {
                $($name,)+
                Unknown(u8),
            }

            impl MbrPartitionKind {
                pub fn from_byte(byte: u8) -> Self {
                    match byte {
                        $(b if b == [<MBR_PARTITION_TYPE_ $name:upper>] => Self::$name,)+
                        other => Self::Unknown(other),
                    }
                }

                pub fn as_byte(&self) -> u8 {
                    match self {
                        $(Self::$name => [<MBR_PARTITION_TYPE_ $name:upper>],)+
                        Self::Unknown(byte) => *byte,
                    }
                }
            }

            impl core::fmt::Display for MbrPartitionKind {
                fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                    match self {
                        $(Self::$name => write!(f, $desc),)+
                        Self::Unknown(byte) => write!(f, "Unknown ({:#04X})", byte),
                    }
                }
            }
        }
    };
}
