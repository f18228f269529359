use enumflags2::{BitFlags, RawBitFlags};
use std::fmt;

/// Renders set flags as `A | B | C`, or `-` when no flag is set.
pub struct FlagList<T: RawBitFlags>(pub BitFlags<T>);

impl<T: RawBitFlags + fmt::Debug> fmt::Display for FlagList<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("-");
        }
        let mut it = self.0.iter().peekable();
        while let Some(v) = it.next() {
            write!(f, "{:?}", v)?;
            if it.peek().is_some() {
                write!(f, " | ")?;
            }
        }
        Ok(())
    }
}

impl<T: RawBitFlags + fmt::Debug> fmt::Debug for FlagList<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "BitFlags({})", self)
    }
}

/// Renders a characteristic value as upper case hex, `<empty>` if there are no bytes.
pub fn hex_value(value: &[u8]) -> String {
    if value.is_empty() {
        "<empty>".into()
    } else {
        hex::encode_upper(value)
    }
}
