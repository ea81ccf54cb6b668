//! Bit-packed storage for discretized features.
//!
//! [`bit_pack`] holds the codec primitives: the legal pack widths and the
//! pack/unpack routines over machine words. [`packed_bin`] builds per-feature
//! storage on top of them, sized through the overflow-checked allocator.

pub mod bit_pack;
pub mod packed_bin;

pub use bit_pack::{items_per_pack_for_bins, pack, unpack, Dynamic, Fixed, Hinted, PackWidth, UnpackIter};
pub use packed_bin::{tensor_bin_count, PackedBin, PackedBinHeader, PackedBinIterator};
