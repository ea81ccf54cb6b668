//! Bit-pack codec for small integers.
//!
//! Bin indices are stored `items_per_pack` to a [`StorageWord`], least
//! significant slot first, each item taking `bits_per_item` bits. Legal
//! specialized widths form a progression obtained by repeatedly computing
//! `BITS / (BITS / prev + 1)` from the word width down to one; on a 64-bit
//! word this is 64, 32, 21, 16, 12, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1.
//!
//! The encode/decode bodies are written once against the [`PackWidth`]
//! trait. [`Fixed`] supplies the width as a constant so shifts and masks fold
//! away, [`Dynamic`] carries it as a runtime value, and [`Hinted`] is whatever
//! the pack-width dispatcher resolved. All of them produce the same layout.

use crate::core::constants::*;
use crate::core::dispatch::get_items_per_bit_pack;
use crate::core::error::{GamError, Result};
use crate::core::safety::{convert, count_bits_required};
use crate::core::types::{BinIndex, StorageWord};

/// Bits per item at a given pack width.
///
/// Only meaningful for `1 <= items_per_pack <= BITS_FOR_STORAGE_TYPE`.
#[inline(always)]
pub const fn bits_per_item(items_per_pack: usize) -> usize {
    BITS_FOR_STORAGE_TYPE / items_per_pack
}

/// Next smaller width on the progression, or the dynamic sentinel after the
/// last one.
pub const fn next_pack_width(prev: isize) -> isize {
    if ITEMS_PER_BIT_PACK_MIN == prev {
        ITEMS_PER_BIT_PACK_DYNAMIC
    } else {
        let bits = BITS_FOR_STORAGE_TYPE as isize;
        bits / (bits / prev + 1)
    }
}

const fn progression_len() -> usize {
    let mut width = ITEMS_PER_BIT_PACK_MAX;
    let mut count = 0;
    while ITEMS_PER_BIT_PACK_DYNAMIC != width {
        count += 1;
        width = next_pack_width(width);
    }
    count
}

/// Number of widths on the progression (15 for a 64-bit word).
pub const PACK_WIDTH_PROGRESSION_LEN: usize = progression_len();

/// True iff `items_per_pack` is one of the specialized widths.
pub const fn is_on_progression(items_per_pack: isize) -> bool {
    let mut width = ITEMS_PER_BIT_PACK_MAX;
    while ITEMS_PER_BIT_PACK_DYNAMIC != width {
        if width == items_per_pack {
            return true;
        }
        width = next_pack_width(width);
    }
    false
}

/// The progression from the densest width down to one.
pub fn pack_width_progression() -> impl Iterator<Item = isize> {
    std::iter::successors(Some(ITEMS_PER_BIT_PACK_MAX), |&prev| {
        Some(next_pack_width(prev)).filter(|&next| ITEMS_PER_BIT_PACK_DYNAMIC != next)
    })
}

/// Densest progression width able to hold bin indices `0..bin_count`.
///
/// A single bin needs no storage and yields [`ITEMS_PER_BIT_PACK_NONE`].
/// Zero bins cannot be represented and yield `None`.
pub fn items_per_pack_for_bins(bin_count: usize) -> Option<isize> {
    match bin_count {
        0 => None,
        1 => Some(ITEMS_PER_BIT_PACK_NONE),
        _ => {
            let bits_required = count_bits_required(bin_count - 1);
            pack_width_progression()
                .find(|&width| bits_required <= bits_per_item(width as usize))
        }
    }
}

/// Words needed to store `item_count` items at `items_per_pack`.
#[inline]
pub const fn word_count(item_count: usize, items_per_pack: usize) -> usize {
    item_count.div_ceil(items_per_pack)
}

/// Pack width supplied either at compile time or at runtime.
pub trait PackWidth: Copy {
    fn items_per_pack(self) -> usize;

    #[inline(always)]
    fn bits_per_item(self) -> usize {
        bits_per_item(self.items_per_pack())
    }

    #[inline(always)]
    fn mask(self) -> StorageWord {
        let bits = self.bits_per_item();
        if BITS_FOR_STORAGE_TYPE <= bits {
            StorageWord::MAX
        } else {
            ((1 as StorageWord) << bits) - 1
        }
    }
}

/// Compile-time pack width. `N` must be on the progression.
///
/// Only [`Fixed::new`] builds one, and it refuses other widths at build time:
///
/// ```compile_fail
/// let width = gam_native::io::bit_pack::Fixed::<11>::new();
/// ```
///
/// ```compile_fail
/// let width: gam_native::io::bit_pack::Fixed<8> = gam_native::io::bit_pack::Fixed(());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Fixed<const N: isize>(());

impl<const N: isize> Fixed<N> {
    const ON_PROGRESSION: () = assert!(is_on_progression(N), "pack width is not on the progression");

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::ON_PROGRESSION;
        Fixed(())
    }
}

impl<const N: isize> PackWidth for Fixed<N> {
    #[inline(always)]
    fn items_per_pack(self) -> usize {
        #[allow(clippy::let_unit_value)]
        let () = Self::ON_PROGRESSION;
        N as usize
    }
}

/// Runtime pack width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dynamic {
    items_per_pack: usize,
}

impl Dynamic {
    /// Any width from one item per word up to one bit per item. Widths off the
    /// progression are accepted: the dynamic path does not depend on it.
    pub const fn new(items_per_pack: usize) -> Option<Self> {
        if 0 < items_per_pack && items_per_pack <= BITS_FOR_STORAGE_TYPE {
            Some(Dynamic { items_per_pack })
        } else {
            None
        }
    }
}

impl PackWidth for Dynamic {
    #[inline(always)]
    fn items_per_pack(self) -> usize {
        self.items_per_pack
    }
}

/// Width handed to a pack-width visitor: the constant `N` on a specialized
/// path, the carried runtime width when `N` is the dynamic sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hinted<const N: isize> {
    runtime: usize,
}

impl<const N: isize> Hinted<N> {
    /// `None` when the resolved width stores nothing
    /// ([`ITEMS_PER_BIT_PACK_NONE`]) or is unusable.
    #[inline(always)]
    pub fn new(runtime: isize) -> Option<Self> {
        let items_per_pack = convert::<usize, isize>(get_items_per_bit_pack::<N>(|| runtime))?;
        Dynamic::new(items_per_pack).map(|width| Hinted {
            runtime: width.items_per_pack,
        })
    }
}

impl<const N: isize> PackWidth for Hinted<N> {
    #[inline(always)]
    fn items_per_pack(self) -> usize {
        if ITEMS_PER_BIT_PACK_DYNAMIC == N {
            self.runtime
        } else {
            N as usize
        }
    }
}

/// Pack `values` into `out`, which must hold at least
/// `word_count(values.len(), items_per_pack)` words.
///
/// A value wider than `bits_per_item` is an error, as is a short `out`.
/// Words past the last one needed are left as found.
pub fn pack_into<W: PackWidth>(values: &[BinIndex], width: W, out: &mut [StorageWord]) -> Result<()> {
    let items = width.items_per_pack();
    let bits = width.bits_per_item();
    let mask = width.mask();
    let needed = word_count(values.len(), items);
    if out.len() < needed {
        return Err(GamError::dimension_mismatch(
            format!("at least {} words", needed),
            format!("{} words", out.len()),
        ));
    }
    for (chunk_index, (word, chunk)) in out.iter_mut().zip(values.chunks(items)).enumerate() {
        let mut packed: StorageWord = 0;
        for (slot, &value) in chunk.iter().enumerate() {
            if 0 != (value as StorageWord & !mask) {
                return Err(GamError::invalid_parameter(
                    format!("values[{}]", chunk_index * items + slot),
                    value.to_string(),
                    format!("does not fit in {} bits", bits),
                ));
            }
            packed |= (value as StorageWord) << (slot * bits);
        }
        *word = packed;
    }
    Ok(())
}

/// Pack `values` into a new word vector.
pub fn pack<W: PackWidth>(values: &[BinIndex], width: W) -> Result<Vec<StorageWord>> {
    let mut words = vec![0; word_count(values.len(), width.items_per_pack())];
    pack_into(values, width, &mut words)?;
    Ok(words)
}

/// Pack with a width known only at runtime.
pub fn pack_dynamic(values: &[BinIndex], items_per_pack: usize) -> Result<Vec<StorageWord>> {
    let width = Dynamic::new(items_per_pack).ok_or_else(|| {
        GamError::illegal_pack_width(convert::<isize, usize>(items_per_pack).unwrap_or(isize::MAX))
    })?;
    pack(values, width)
}

/// Value at logical position `index`.
///
/// Panics if `index` is past the last stored word.
#[inline(always)]
pub fn unpack<W: PackWidth>(words: &[StorageWord], width: W, index: usize) -> BinIndex {
    let items = width.items_per_pack();
    let shift = (index % items) * width.bits_per_item();
    ((words[index / items] >> shift) & width.mask()) as BinIndex
}

/// Unpack with a width known only at runtime.
#[inline]
pub fn unpack_dynamic(words: &[StorageWord], items_per_pack: usize, index: usize) -> Option<BinIndex> {
    let width = Dynamic::new(items_per_pack)?;
    if words.len() <= index / items_per_pack {
        return None;
    }
    Some(unpack(words, width, index))
}

/// Sequential decoder that walks the words without divisions.
#[derive(Debug, Clone)]
pub struct UnpackIter<'a, W: PackWidth> {
    words: &'a [StorageWord],
    width: W,
    current: StorageWord,
    slot: usize,
    remaining: usize,
}

impl<'a, W: PackWidth> UnpackIter<'a, W> {
    /// Decode the first `count` items of `words`.
    pub fn new(words: &'a [StorageWord], width: W, count: usize) -> Self {
        let count = count.min(words.len().saturating_mul(width.items_per_pack()));
        UnpackIter {
            words,
            width,
            current: 0,
            slot: width.items_per_pack(),
            remaining: count,
        }
    }
}

impl<'a, W: PackWidth> Iterator for UnpackIter<'a, W> {
    type Item = BinIndex;

    #[inline]
    fn next(&mut self) -> Option<BinIndex> {
        if 0 == self.remaining {
            return None;
        }
        if self.width.items_per_pack() == self.slot {
            let (&first, rest) = self.words.split_first()?;
            self.current = first;
            self.words = rest;
            self.slot = 0;
        }
        let value = (self.current & self.width.mask()) as BinIndex;
        // a full-width item has no bits left to shift in
        self.current = self.current.checked_shr(self.width.bits_per_item() as u32).unwrap_or(0);
        self.slot += 1;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, W: PackWidth> ExactSizeIterator for UnpackIter<'a, W> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_progression_64() {
        let widths: Vec<isize> = pack_width_progression().collect();
        assert_eq!(widths, vec![64, 32, 21, 16, 12, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(PACK_WIDTH_PROGRESSION_LEN, 15);
    }

    #[test]
    fn test_next_pack_width_terminates() {
        let mut width = ITEMS_PER_BIT_PACK_MAX;
        let mut steps = 0;
        while ITEMS_PER_BIT_PACK_DYNAMIC != width {
            assert!(is_on_progression(width));
            width = next_pack_width(width);
            steps += 1;
        }
        assert_eq!(steps, PACK_WIDTH_PROGRESSION_LEN);
        assert_eq!(next_pack_width(1), ITEMS_PER_BIT_PACK_DYNAMIC);
    }

    #[test]
    fn test_off_progression_widths() {
        assert!(!is_on_progression(0));
        assert!(!is_on_progression(-1));
        assert!(!is_on_progression(11));
        assert!(!is_on_progression(ITEMS_PER_BIT_PACK_MAX + 1));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_bits_per_item() {
        assert_eq!(bits_per_item(64), 1);
        assert_eq!(bits_per_item(21), 3);
        assert_eq!(bits_per_item(8), 8);
        assert_eq!(bits_per_item(1), 64);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_items_per_pack_for_bins() {
        assert_eq!(items_per_pack_for_bins(0), None);
        assert_eq!(items_per_pack_for_bins(1), Some(ITEMS_PER_BIT_PACK_NONE));
        assert_eq!(items_per_pack_for_bins(2), Some(64));
        assert_eq!(items_per_pack_for_bins(3), Some(32));
        assert_eq!(items_per_pack_for_bins(8), Some(21));
        assert_eq!(items_per_pack_for_bins(9), Some(16));
        assert_eq!(items_per_pack_for_bins(256), Some(8));
        assert_eq!(items_per_pack_for_bins(257), Some(7));
        assert_eq!(items_per_pack_for_bins(usize::MAX), Some(1));
    }

    #[test]
    fn test_mask() {
        assert_eq!(Fixed::<1>::new().mask(), StorageWord::MAX);
        assert_eq!(Fixed::<2>::new().mask(), (1 << (BITS_FOR_STORAGE_TYPE / 2)) - 1);
        assert_eq!(Dynamic::new(BITS_FOR_STORAGE_TYPE).map(|w| w.mask()), Some(1));
    }

    #[test]
    fn test_layout_least_significant_first() {
        let words = pack(&[1, 2, 3], Fixed::<4>::new()).unwrap();
        let bits = BITS_FOR_STORAGE_TYPE / 4;
        assert_eq!(words, vec![1 | (2 << bits) | (3 << (2 * bits))]);
    }

    #[test]
    fn test_partial_word_is_zero_padded() {
        let values = [3usize, 1, 2, 0, 3];
        let words = pack(&values, Fixed::<2>::new()).unwrap();
        assert_eq!(words.len(), 3);
        // the last word holds a single item and nothing above it
        assert_eq!(words[2], 3);
        for (index, &value) in values.iter().enumerate() {
            assert_eq!(unpack(&words, Fixed::<2>::new(), index), value);
        }
    }

    #[test]
    fn test_fixed_and_dynamic_agree() {
        let values: Vec<usize> = (0..100).map(|i| (i * 7) % 128).collect();
        let fixed = pack(&values, Fixed::<8>::new()).unwrap();
        let dynamic = pack_dynamic(&values, 8).unwrap();
        assert_eq!(fixed, dynamic);
        for index in 0..values.len() {
            assert_eq!(unpack(&fixed, Fixed::<8>::new(), index), values[index]);
            assert_eq!(unpack_dynamic(&dynamic, 8, index), Some(values[index]));
        }
    }

    #[test]
    fn test_values_wider_than_slot_are_rejected() {
        let bits = BITS_FOR_STORAGE_TYPE / 32;
        let err = pack(&[1, 1 << bits], Fixed::<32>::new()).unwrap_err();
        assert_eq!(err.category(), "invalid_parameter");
        assert!(err.to_string().contains("values[1]"));
        // 5 needs 3 bits, a 2-bit slot would keep only the low bit
        assert!(pack_dynamic(&[5], BITS_FOR_STORAGE_TYPE / 2).is_err());
        assert!(pack_dynamic(&[usize::MAX], 1).is_ok());
    }

    #[test]
    fn test_pack_into_short_output() {
        let mut out = [0; 1];
        let err = pack_into(&[1; 3], Fixed::<2>::new(), &mut out).unwrap_err();
        assert_eq!(err.category(), "dimension_mismatch");
    }

    #[test]
    fn test_hinted_width_resolution() {
        assert_eq!(Hinted::<8>::new(8).map(|w| w.items_per_pack()), Some(8));
        assert_eq!(Hinted::<{ ITEMS_PER_BIT_PACK_DYNAMIC }>::new(11).map(|w| w.items_per_pack()), Some(11));
        assert_eq!(Hinted::<{ ITEMS_PER_BIT_PACK_NONE }>::new(ITEMS_PER_BIT_PACK_NONE), None);
        assert_eq!(Hinted::<{ ITEMS_PER_BIT_PACK_DYNAMIC }>::new(0), None);
        assert_eq!(Hinted::<{ ITEMS_PER_BIT_PACK_DYNAMIC }>::new(-3), None);

        let values: Vec<usize> = (0..50).map(|i| i % 256).collect();
        let hinted = pack(&values, Hinted::<8>::new(8).unwrap()).unwrap();
        assert_eq!(hinted, pack(&values, Fixed::<8>::new()).unwrap());
    }

    #[test]
    fn test_dynamic_rejects_unusable_width() {
        assert!(Dynamic::new(0).is_none());
        assert!(Dynamic::new(BITS_FOR_STORAGE_TYPE + 1).is_none());
        assert_eq!(pack_dynamic(&[1], 0).unwrap_err().category(), "illegal_pack_width");
        assert_eq!(unpack_dynamic(&[0], 0, 0), None);
        assert_eq!(unpack_dynamic(&[0], 4, 4), None);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_dynamic_off_progression_width() {
        let values: Vec<usize> = (0..30).map(|i| i % 32).collect();
        let words = pack_dynamic(&values, 11).unwrap();
        assert_eq!(words.len(), 3);
        for (index, &value) in values.iter().enumerate() {
            assert_eq!(unpack_dynamic(&words, 11, index), Some(value));
        }
    }

    #[test]
    fn test_unpack_iter() {
        let values: Vec<usize> = (0..37).map(|i| i % 5).collect();
        let words = pack(&values, Fixed::<8>::new()).unwrap();
        let decoded: Vec<usize> = UnpackIter::new(&words, Fixed::<8>::new(), values.len()).collect();
        assert_eq!(decoded, values);

        let full: Vec<usize> = UnpackIter::new(&[usize::MAX, 7], Fixed::<1>::new(), 2).collect();
        assert_eq!(full, vec![usize::MAX, 7]);
        assert_eq!(UnpackIter::new(&words, Fixed::<8>::new(), 5).len(), 5);
    }

    #[test]
    fn test_empty_input() {
        assert!(pack(&[], Fixed::<8>::new()).unwrap().is_empty());
        assert_eq!(UnpackIter::new(&[], Fixed::<8>::new(), 10).count(), 0);
    }
}
