//! Building blocks for the static Huffman coder.
//! These work on buffers, the framing and stream handling is in `static_huff`.

pub mod freq_table;
pub mod huff_tree;
pub mod bit_packer;
