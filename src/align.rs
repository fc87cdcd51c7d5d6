/// Rounds the given size up to the block alignment (8 bytes).
///
/// Block sizes are always multiples of 8, which keeps the low three bits
/// of every boundary tag free for flags.
///
/// # Examples
///
/// ```rust
/// use tagalloc::align;
///
/// assert_eq!(align!(0), 0);
/// assert_eq!(align!(1), 8);
/// assert_eq!(align!(13), 16);
/// assert_eq!(align!(16), 16);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::tag::ALIGNMENT - 1) & !($crate::tag::ALIGNMENT - 1)
  };
}

/// Like [`align!`], but returns `None` instead of overflowing.
pub fn checked_align(value: usize) -> Option<usize> {
  value
    .checked_add(crate::tag::ALIGNMENT - 1)
    .map(|v| v & !(crate::tag::ALIGNMENT - 1))
}
