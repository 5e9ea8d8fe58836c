/// A hexadecimal representation of a value, zero-padded to the width of
/// its type.
///
/// Used to render addresses and status codes in log records and error text.
///
/// # Examples
///
/// ```
/// # use procpeek_core::Hex;
/// assert_eq!(format!("{}", Hex(42u16)), "0x002a");
/// assert_eq!(format!("{}", Hex(0xC0000004u32)), "0xc0000004");
/// ```
pub struct Hex<T>(pub T);

impl<T> std::fmt::Display for Hex<T>
where
    T: Copy + std::fmt::LowerHex,
{
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let digits = size_of::<T>() * 2;
        write!(f, "0x{:0digits$x}", self.0)
    }
}

impl<T> std::fmt::Debug for Hex<T>
where
    T: Copy + std::fmt::LowerHex,
{
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}
