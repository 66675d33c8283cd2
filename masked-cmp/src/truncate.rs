/// Truncate an unsigned integer to a narrower width, keeping the low-order bits
pub trait Truncate<T> {
    /// Truncate `x` to the width of `Self`.
    fn truncate(x: T) -> Self;
}

macro_rules! define_truncate {
    ($from:ident, $to:ident) => {
        impl Truncate<$from> for $to {
            // The mask makes the narrowing explicit; the cast cannot lose set bits.
            #[allow(clippy::cast_possible_truncation)]
            fn truncate(x: $from) -> $to {
                (x & $from::from($to::MAX)) as $to
            }
        }
    };
}

define_truncate!(u64, u32);
define_truncate!(u128, u64);
