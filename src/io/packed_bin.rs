//! Bit-packed per-feature bin storage.
//!
//! A [`PackedBin`] keeps one feature (or one multi-feature term) as a single
//! allocation: a small header followed by the packed words. The pack width is
//! chosen once from the bin count and never changes for the lifetime of the
//! storage.

use crate::core::constants::*;
use crate::core::dispatch::{
    dispatch_dimensions, dispatch_items_per_pack, get_dimensions, DimensionsVisitor, ItemsPerPackVisitor,
};
use crate::core::error::{GamError, Result};
use crate::core::memory::TrailingArray;
use crate::core::safety::checked_product;
use crate::core::types::{BinIndex, StorageWord};
use crate::io::bit_pack::{items_per_pack_for_bins, pack_into, unpack, word_count, Dynamic, Hinted, UnpackIter};

/// Fixed part of the packed storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedBinHeader {
    /// Number of logical items (samples)
    pub num_items: usize,
    /// Pack width, or [`ITEMS_PER_BIT_PACK_NONE`] for a single-bin feature
    pub items_per_pack: isize,
    /// Number of distinct bins; every stored value is below it
    pub bin_count: usize,
}

/// Packed bin indices for one feature or term.
#[derive(Debug)]
pub struct PackedBin {
    storage: TrailingArray<PackedBinHeader, StorageWord>,
}

impl PackedBin {
    /// Pack `bins`, each of which must be below `bin_count`.
    ///
    /// A single-bin feature stores no words: every item is bin zero.
    pub fn from_bins(bins: &[BinIndex], bin_count: usize) -> Result<Self> {
        let items_per_pack = items_per_pack_for_bins(bin_count).ok_or_else(|| {
            GamError::invalid_parameter("bin_count", "0", "at least one bin is required")
        })?;

        if let Some(index) = bins.iter().position(|&bin| bin_count <= bin) {
            return Err(GamError::invalid_parameter(
                format!("bins[{}]", index),
                bins[index].to_string(),
                format!("must be below the bin count {}", bin_count),
            ));
        }

        let header = PackedBinHeader {
            num_items: bins.len(),
            items_per_pack,
            bin_count,
        };

        let storage = if ITEMS_PER_BIT_PACK_NONE == items_per_pack {
            TrailingArray::new(header, 0)?
        } else {
            let items = items_per_pack as usize;
            let mut storage = TrailingArray::new(header, word_count(bins.len(), items))?;
            dispatch_items_per_pack(
                items_per_pack,
                EncodeAll {
                    bins,
                    items_per_pack,
                    out: storage.items_mut(),
                },
            )?;
            storage
        };

        log::debug!(
            "packed {} items over {} bins at {} items per word",
            bins.len(),
            bin_count,
            items_per_pack
        );
        Ok(PackedBin { storage })
    }

    /// Pack a multi-feature term as flattened tensor indices.
    ///
    /// `columns[d][i]` is the bin of sample `i` in dimension `d`. The first
    /// dimension varies fastest. The tensor size is the product of
    /// `bin_counts` and must not overflow.
    pub fn from_term(columns: &[&[BinIndex]], bin_counts: &[usize]) -> Result<Self> {
        let dimensions = columns.len();
        if 0 == dimensions || MAX_DIMENSIONS < dimensions {
            return Err(GamError::invalid_parameter(
                "dimensions",
                dimensions.to_string(),
                format!("must be between 1 and {}", MAX_DIMENSIONS),
            ));
        }
        if bin_counts.len() != dimensions {
            return Err(GamError::dimension_mismatch(
                format!("{} bin counts", dimensions),
                format!("{} bin counts", bin_counts.len()),
            ));
        }
        let num_items = columns[0].len();
        if let Some(column) = columns.iter().find(|column| column.len() != num_items) {
            return Err(GamError::dimension_mismatch(
                format!("{} items per column", num_items),
                format!("{} items", column.len()),
            ));
        }

        let tensor_bins = tensor_bin_count(bin_counts)?;
        for (column, &bin_count) in columns.iter().zip(bin_counts) {
            if let Some(&bin) = column.iter().find(|&&bin| bin_count <= bin) {
                return Err(GamError::invalid_parameter(
                    "bin",
                    bin.to_string(),
                    format!("must be below the bin count {}", bin_count),
                ));
            }
        }

        let combined = dispatch_dimensions(
            dimensions,
            FlattenTerm {
                columns,
                bin_counts,
                num_items,
            },
        );
        Self::from_bins(&combined, tensor_bins)
    }

    pub fn header(&self) -> PackedBinHeader {
        self.storage.header()
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.header().num_items
    }

    pub fn is_empty(&self) -> bool {
        0 == self.len()
    }

    pub fn bin_count(&self) -> usize {
        self.header().bin_count
    }

    pub fn items_per_pack(&self) -> isize {
        self.header().items_per_pack
    }

    /// The packed words.
    pub fn words(&self) -> &[StorageWord] {
        self.storage.items()
    }

    /// Bytes held by the header and the words together.
    pub fn size_in_bytes(&self) -> usize {
        self.storage.size_in_bytes()
    }

    /// Bin of item `index`, `None` when out of range.
    #[inline]
    pub fn get(&self, index: usize) -> Option<BinIndex> {
        let header = self.header();
        if header.num_items <= index {
            return None;
        }
        Some(dispatch_items_per_pack(
            header.items_per_pack,
            GetItem {
                words: self.words(),
                items_per_pack: header.items_per_pack,
                index,
            },
        ))
    }

    /// Decode every item into `out`, which must hold [`PackedBin::len`] values.
    ///
    /// The width is resolved once, outside the loop.
    pub fn decode_into(&self, out: &mut [BinIndex]) -> Result<()> {
        let header = self.header();
        if out.len() != header.num_items {
            return Err(GamError::dimension_mismatch(
                header.num_items.to_string(),
                out.len().to_string(),
            ));
        }
        dispatch_items_per_pack(
            header.items_per_pack,
            DecodeAll {
                words: self.words(),
                items_per_pack: header.items_per_pack,
                out,
            },
        );
        Ok(())
    }

    /// Sequential decoder over all items.
    pub fn iter(&self) -> PackedBinIterator<'_> {
        let header = self.header();
        let inner = if ITEMS_PER_BIT_PACK_NONE == header.items_per_pack {
            None
        } else {
            Dynamic::new(header.items_per_pack as usize)
                .map(|width| UnpackIter::new(self.words(), width, header.num_items))
        };
        PackedBinIterator {
            inner,
            remaining: header.num_items,
        }
    }
}

impl<'a> IntoIterator for &'a PackedBin {
    type Item = BinIndex;
    type IntoIter = PackedBinIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the bins of a [`PackedBin`].
#[derive(Debug, Clone)]
pub struct PackedBinIterator<'a> {
    inner: Option<UnpackIter<'a, Dynamic>>,
    remaining: usize,
}

impl<'a> Iterator for PackedBinIterator<'a> {
    type Item = BinIndex;

    fn next(&mut self) -> Option<BinIndex> {
        if 0 == self.remaining {
            return None;
        }
        self.remaining -= 1;
        match self.inner.as_mut() {
            Some(inner) => inner.next(),
            // single bin, nothing stored
            None => Some(0),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a> ExactSizeIterator for PackedBinIterator<'a> {}

/// Number of cells in a tensor with the given per-dimension bin counts.
pub fn tensor_bin_count(bin_counts: &[usize]) -> Result<usize> {
    bin_counts
        .iter()
        .try_fold(1usize, |total, &bins| checked_product(total, bins, "tensor bin count"))
}

struct EncodeAll<'a, 'b> {
    bins: &'a [BinIndex],
    items_per_pack: isize,
    out: &'b mut [StorageWord],
}

impl<'a, 'b> ItemsPerPackVisitor for EncodeAll<'a, 'b> {
    type Output = Result<()>;

    fn visit<const N: isize>(self) -> Result<()> {
        let width = Hinted::<N>::new(self.items_per_pack)
            .ok_or_else(|| GamError::illegal_pack_width(self.items_per_pack))?;
        pack_into(self.bins, width, self.out)
    }
}

struct GetItem<'a> {
    words: &'a [StorageWord],
    items_per_pack: isize,
    index: usize,
}

impl<'a> ItemsPerPackVisitor for GetItem<'a> {
    type Output = BinIndex;

    #[inline(always)]
    fn visit<const N: isize>(self) -> BinIndex {
        // no width means a single-bin feature
        Hinted::<N>::new(self.items_per_pack).map_or(0, |width| unpack(self.words, width, self.index))
    }
}

struct DecodeAll<'a, 'b> {
    words: &'a [StorageWord],
    items_per_pack: isize,
    out: &'b mut [BinIndex],
}

impl<'a, 'b> ItemsPerPackVisitor for DecodeAll<'a, 'b> {
    type Output = ();

    fn visit<const N: isize>(self) {
        match Hinted::<N>::new(self.items_per_pack) {
            Some(width) => {
                let count = self.out.len();
                for (slot, bin) in self.out.iter_mut().zip(UnpackIter::new(self.words, width, count)) {
                    *slot = bin;
                }
            }
            None => self.out.fill(0),
        }
    }
}

struct FlattenTerm<'a> {
    columns: &'a [&'a [BinIndex]],
    bin_counts: &'a [usize],
    num_items: usize,
}

impl<'a> DimensionsVisitor for FlattenTerm<'a> {
    type Output = Vec<BinIndex>;

    fn visit<const N: usize>(self) -> Vec<BinIndex> {
        let dimensions = get_dimensions::<N>(|| self.columns.len());
        (0..self.num_items)
            .map(|item| {
                let mut tensor_index = 0;
                let mut stride = 1;
                for dimension in 0..dimensions {
                    tensor_index += self.columns[dimension][item] * stride;
                    stride *= self.bin_counts[dimension];
                }
                tensor_index
            })
            .collect()
    }
}
