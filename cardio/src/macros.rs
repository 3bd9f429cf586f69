// SPDX-License-Identifier: MIT

/// Wires `From` conversions between the layered error types and the top-level error.
#[macro_export]
macro_rules! card_error_wiring {
    (
        top => $top:ty {
            $($top_src:ty : $top_variant:ident),+ $(,)?   // sub-errors -> top::<Variant>
        },
        str_into => [ $($str_tgt:ty),* $(,)? ],           // &str -> each tgt::Other + top::Other
        sub => {
            $($src_sub:ty => [ $($dst_sub:ident::$dst_variant:ident),+ ] ),* $(,)?  // S -> D::Variant
        } $(,)?
    ) => {
        $(
            impl From<$top_src> for $top {
                #[inline]
                fn from(e: $top_src) -> Self { <$top>::$top_variant(e) }
            }
        )+

        $(
            impl From<&'static str> for $str_tgt {
                #[inline]
                fn from(msg: &'static str) -> Self { <$str_tgt>::Other(msg) }
            }
        )*
        impl From<&'static str> for $top {
            #[inline]
            fn from(msg: &'static str) -> Self { <$top>::Other(msg) }
        }

        $(
            $(
                impl From<$src_sub> for $dst_sub {
                    #[inline]
                    fn from(e: $src_sub) -> Self { <$dst_sub>::$dst_variant(e) }
                }
            )+
        )*
    };
}

/// Defines the card command set.
///
/// For each `NAME => opcode` pair this generates:
/// - `pub const NAME: u8` holding the 6-bit opcode
/// - `Command::name(argument)` constructor
///
/// An optional `crc = 0x..` gives the fixed checksum byte the opcode must be
/// sent with; every other opcode is sent with [`CHECKSUM_SENTINEL`].
///
/// Also generates `fixed_checksum(opcode)` and `command_name(opcode)`.
///
/// [`CHECKSUM_SENTINEL`]: crate::command::CHECKSUM_SENTINEL
#[macro_export]
macro_rules! define_commands {
    (
        $(
            $(#[doc = $doc:expr])*
            $name:ident => $opcode:expr $(, crc = $crc:expr)?
        );+ $(;)?
    ) => {
        paste::paste! {
            $(
                $(#[doc = $doc])*
                pub const $name: u8 = $opcode;
            )+

            impl $crate::command::Command {
                $(
                    $(#[doc = $doc])*
                    #[inline]
                    pub const fn [<$name:lower>](argument: u32) -> Self {
                        Self::new($name, argument)
                    }
                )+
            }

            /// Checksum byte an opcode must carry, or the sentinel.
            pub const fn fixed_checksum(opcode: u8) -> u8 {
                $(
                    $(
                        if opcode == $name {
                            return $crc;
                        }
                    )?
                )+
                $crate::command::CHECKSUM_SENTINEL
            }

            /// Symbolic name of a known opcode.
            pub fn command_name(opcode: u8) -> &'static str {
                match opcode {
                    $($name => stringify!($name),)+
                    _ => "UNKNOWN",
                }
            }
        }
    };
}
