//! # Static Huffman Compression
//!
//! Compress and expand byte streams with a Huffman code built from the
//! symbol frequencies of the whole input.  The frequency table is stored
//! ahead of the packed codewords, so the container needs no external metadata.
//!
//! * `static_huff` is the entry point, it frames the tree and the payload
//! * building blocks (frequency table, tree, bit packing) are in `tools`
//!
//! Example:
//! ```
//! let compressed = statichuff::static_huff::encode(b"aabbbcccc").expect("compression failed");
//! let expanded = statichuff::static_huff::decode(&compressed).expect("expansion failed");
//! assert_eq!(expanded,b"aabbbcccc".to_vec());
//! ```

pub mod tools;
pub mod static_huff;

type DYNERR = Box<dyn std::error::Error>;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

/// Codec Errors
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("file format mismatch")]
    FileFormatMismatch,
    #[error("tree section is truncated")]
    TruncatedTree,
    #[error("payload is truncated")]
    TruncatedPayload,
    #[error("bad padding count")]
    BadPadding,
    #[error("frequency does not fit in one byte")]
    FrequencyOverflow,
    #[error("file too large")]
    FileTooLarge
}

/// Options controlling compression
#[derive(Clone)]
pub struct Options {
    /// starting position in the input file
    pub in_offset: u64,
    /// starting position in the output file
    pub out_offset: u64,
    /// return error if file is larger
    pub max_file_size: u64
}

pub const STD_OPTIONS: Options = Options {
    in_offset: 0,
    out_offset: 0,
    max_file_size: u32::MAX as u64/4
};
