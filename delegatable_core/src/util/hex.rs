//! Hexadecimal formatting.

use std::fmt;

/// Write `bytes` as lowercase hex, prefixed with `0x` in alternate mode (`{:#x}`).
pub(crate) fn bytes_as_hex(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if f.alternate() {
        f.write_str("0x")?;
    }

    bytes.iter().try_for_each(|byte| write!(f, "{byte:02x}"))
}
