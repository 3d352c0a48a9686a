//! Static Huffman Compression
//!
//! The whole input is counted first, the counts are scaled to fit in one byte,
//! and a Huffman code is built from them.  The container is the tree section
//! followed immediately by the packed codewords:
//!
//! * `n`, the number of distinct symbols, capped at 255
//! * if `n > 127`, 256 frequencies indexed by symbol (0 = absent)
//! * otherwise `n` pairs of (symbol,frequency)
//! * padding count (0-7), then the codewords packed MSB first
//!
//! There is no length field, the end of the tree section follows from `n`.
//! When the input has only one distinct symbol each occurrence is coded as a single 0 bit,
//! so the payload carries the exact count even if the stored frequency was scaled.
//! Empty input gives an empty container and vice versa.

use bit_vec::BitVec;
use std::io::{Cursor,Read,Write,Seek,SeekFrom,BufReader,BufWriter};
use crate::tools::freq_table::*;
use crate::tools::huff_tree::*;
use crate::tools::bit_packer;
use crate::{DYNERR,Error,Options};

/// Serialize the frequency table as the tree section of the container.
/// Pairs are written in the order the symbols first appeared.
/// The table must already be normalized.
pub fn serialize_tree(freqs: &FrequencyTable) -> Result<Vec<u8>,Error> {
    if freqs.max_count() > MAX_STORED_FREQ {
        log::error!("frequency {} needs normalization",freqs.max_count());
        return Err(Error::FrequencyOverflow);
    }
    let distinct = freqs.distinct();
    let mut ans = vec![usize::min(distinct,255) as u8];
    if distinct > POSITIONAL_THRESHOLD {
        log::debug!("positional tree section for {} symbols",distinct);
        for c in 0..=255 {
            ans.push(freqs.get(c) as u8);
        }
    } else {
        log::debug!("paired tree section for {} symbols",distinct);
        for (c,freq) in freqs.iter() {
            ans.push(c);
            ans.push(freq as u8);
        }
    }
    Ok(ans)
}

/// Read a tree section starting at `cursor`.
/// Returns the frequency table and the position just past the tree section.
pub fn deserialize_tree(ibuf: &[u8],cursor: usize) -> Result<(FrequencyTable,usize),Error> {
    let n = match ibuf.get(cursor) {
        Some(n) => *n as usize,
        None => return Err(Error::TruncatedTree)
    };
    let mut freqs = FrequencyTable::new();
    if n > POSITIONAL_THRESHOLD {
        let end = cursor + 1 + 256;
        if ibuf.len() < end {
            log::error!("positional tree section needs {} bytes, have {}",end - cursor,ibuf.len() - cursor);
            return Err(Error::TruncatedTree);
        }
        for (c,freq) in ibuf[cursor+1..end].iter().enumerate() {
            if *freq > 0 {
                freqs.set(c as u8,*freq as usize);
            }
        }
        if usize::min(freqs.distinct(),255) != n {
            log::error!("tree section declares {} symbols but holds {}",n,freqs.distinct());
            return Err(Error::FileFormatMismatch);
        }
        return Ok((freqs,end));
    }
    if n == 0 {
        log::error!("tree section has no symbols");
        return Err(Error::FileFormatMismatch);
    }
    let end = cursor + 1 + 2*n;
    if ibuf.len() < end {
        log::error!("tree section needs {} bytes, have {}",end - cursor,ibuf.len() - cursor);
        return Err(Error::TruncatedTree);
    }
    for pair in ibuf[cursor+1..end].chunks(2) {
        let (c,freq) = (pair[0],pair[1] as usize);
        if freq == 0 || freqs.get(c) > 0 {
            log::error!("bad entry for symbol {} in tree section",c);
            return Err(Error::FileFormatMismatch);
        }
        freqs.set(c,freq);
    }
    Ok((freqs,end))
}

/// Everything computed while encoding one buffer.
pub struct Coder {
    /// normalized frequencies, these are what gets stored
    pub freqs: FrequencyTable,
    pub tree: Option<Tree>,
    pub codebook: Option<Codebook>,
    /// concatenated codewords in input order
    pub encoded: BitVec
}

impl Coder {
    /// Count, build the tree and codebook, and encode `ibuf`.
    /// Empty input leaves everything empty.
    pub fn create(ibuf: &[u8]) -> Result<Self,Error> {
        let mut ans = Self {
            freqs: FrequencyTable::new(),
            tree: None,
            codebook: None,
            encoded: BitVec::new()
        };
        if ibuf.is_empty() {
            return Ok(ans);
        }
        ans.freqs = FrequencyTable::build(ibuf).normalize();
        let tree = Tree::build(&ans.freqs)?;
        let codebook = tree.codebook();
        log::debug!("codebook has {} codewords",codebook.len());
        if tree.is_single_leaf() {
            ans.encoded.grow(ibuf.len(),false);
        } else {
            for c in ibuf {
                match codebook.get(*c) {
                    Some(code) => ans.encoded.extend(code.iter()),
                    None => return Err(Error::FileFormatMismatch)
                }
            }
        }
        log::debug!("encoded {} symbols into {} bits",ibuf.len(),ans.encoded.len());
        ans.tree = Some(tree);
        ans.codebook = Some(codebook);
        Ok(ans)
    }
    /// the tree section, empty if there was no input
    pub fn tree_section(&self) -> Result<Vec<u8>,Error> {
        match self.freqs.is_empty() {
            true => Ok(Vec::new()),
            false => serialize_tree(&self.freqs)
        }
    }
    /// the packed codewords including the padding count
    pub fn payload(&self) -> Vec<u8> {
        bit_packer::pack(&self.encoded)
    }
    /// the whole container
    pub fn to_bytes(&self) -> Result<Vec<u8>,Error> {
        let mut ans = self.tree_section()?;
        ans.append(&mut self.payload());
        Ok(ans)
    }
    /// number of bytes the container takes up
    pub fn usage(&self) -> Result<usize,Error> {
        Ok(self.tree_section()?.len() + self.payload().len())
    }
    /// Decode the coder's own bit stream, does not go through the container.
    pub fn decode(&self) -> Result<Vec<u8>,Error> {
        match &self.tree {
            Some(tree) => tree.walk(&self.encoded),
            None => Ok(Vec::new())
        }
    }
}

/// Rebuild the tree from `freqs` and decode the packed payload.
fn expand_payload(freqs: &FrequencyTable,payload: &[u8]) -> Result<Vec<u8>,Error> {
    if payload.is_empty() {
        log::error!("container has a tree but no payload");
        return Err(Error::TruncatedPayload);
    }
    let tree = Tree::build(freqs)?;
    let bits = bit_packer::unpack(payload)?;
    log::debug!("decoding {} bits",bits.len());
    tree.walk(&bits)
}

/// Encode a buffer into a container.
pub fn encode(ibuf: &[u8]) -> Result<Vec<u8>,Error> {
    Coder::create(ibuf)?.to_bytes()
}

/// Decode a container into the original buffer.
pub fn decode(ibuf: &[u8]) -> Result<Vec<u8>,Error> {
    if ibuf.is_empty() {
        return Ok(Vec::new());
    }
    let (freqs,sep) = deserialize_tree(ibuf,0)?;
    expand_payload(&freqs,&ibuf[sep..])
}

/// Read from `opt.in_offset` to the end, checking the size limit.
fn read_input<R: Read + Seek>(reader: &mut BufReader<R>,opt: &Options) -> Result<Vec<u8>,DYNERR> {
    let mut length = reader.seek(SeekFrom::End(0))?;
    if opt.in_offset > length {
        return Err(Box::new(Error::FileFormatMismatch));
    }
    length -= opt.in_offset;
    if length > opt.max_file_size {
        return Err(Box::new(Error::FileTooLarge));
    }
    reader.seek(SeekFrom::Start(opt.in_offset))?;
    let mut ans = Vec::new();
    reader.read_to_end(&mut ans)?;
    Ok(ans)
}

/// Main compression function.
/// `expanded_in` is an object with `Read` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `compressed_out` is an object with `Write` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// Output starts at `opt.out_offset`, so the container can follow other data.
/// Returns (in_size,out_size) or error.
pub fn compress<R,W>(expanded_in: &mut R, compressed_out: &mut W, opt: &Options) -> Result<(u64,u64),DYNERR>
where R: Read + Seek, W: Write + Seek {
    let mut reader = BufReader::new(expanded_in);
    let mut writer = BufWriter::new(compressed_out);
    let ibuf = read_input(&mut reader,opt)?;
    let obuf = encode(&ibuf)?;
    writer.seek(SeekFrom::Start(opt.out_offset))?;
    writer.write_all(&obuf)?;
    writer.flush()?;
    Ok((ibuf.len() as u64,obuf.len() as u64))
}

/// Main decompression function.
/// `compressed_in` is an object with `Read` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `expanded_out` is an object with `Write` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// The container is read from `opt.in_offset` to the end.
/// Returns (in_size,out_size) or error.
pub fn expand<R,W>(compressed_in: &mut R, expanded_out: &mut W, opt: &Options) -> Result<(u64,u64),DYNERR>
where R: Read + Seek, W: Write + Seek {
    let mut reader = BufReader::new(compressed_in);
    let mut writer = BufWriter::new(expanded_out);
    let ibuf = read_input(&mut reader,opt)?;
    let obuf = decode(&ibuf)?;
    writer.seek(SeekFrom::Start(opt.out_offset))?;
    writer.write_all(&obuf)?;
    writer.flush()?;
    Ok((ibuf.len() as u64,obuf.len() as u64))
}

/// Compress with the tree section and the payload going to separate streams.
/// Concatenating the two outputs gives the same bytes as `compress`.
/// Returns (in_size,out_size) where out_size counts both outputs.
pub fn compress_split<R,W,V>(expanded_in: &mut R, tree_out: &mut W, payload_out: &mut V) -> Result<(u64,u64),DYNERR>
where R: Read, W: Write, V: Write {
    let mut ibuf = Vec::new();
    expanded_in.read_to_end(&mut ibuf)?;
    let coder = Coder::create(&ibuf)?;
    let tree = coder.tree_section()?;
    let payload = coder.payload();
    tree_out.write_all(&tree)?;
    payload_out.write_all(&payload)?;
    tree_out.flush()?;
    payload_out.flush()?;
    log::debug!("tree section {} bytes, payload {} bytes",tree.len(),payload.len());
    Ok((ibuf.len() as u64,(tree.len() + payload.len()) as u64))
}

/// Expand from a tree section and a payload kept in separate streams.
/// The tree stream must hold exactly one tree section.
/// Returns (in_size,out_size) where in_size counts both inputs.
pub fn expand_split<R,S,W>(tree_in: &mut R, payload_in: &mut S, expanded_out: &mut W) -> Result<(u64,u64),DYNERR>
where R: Read, S: Read, W: Write {
    let mut tree = Vec::new();
    let mut payload = Vec::new();
    tree_in.read_to_end(&mut tree)?;
    payload_in.read_to_end(&mut payload)?;
    let in_size = (tree.len() + payload.len()) as u64;
    if tree.is_empty() && payload.is_empty() {
        return Ok((0,0));
    }
    let (freqs,sep) = deserialize_tree(&tree,0)?;
    if sep != tree.len() {
        log::error!("tree stream has {} extra bytes",tree.len() - sep);
        return Err(Box::new(Error::FileFormatMismatch));
    }
    let obuf = expand_payload(&freqs,&payload)?;
    expanded_out.write_all(&obuf)?;
    expanded_out.flush()?;
    Ok((in_size,obuf.len() as u64))
}

/// Convenience function, calls `compress` with a slice returning a Vec
pub fn compress_slice(slice: &[u8],opt: &Options) -> Result<Vec<u8>,DYNERR> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    compress(&mut src,&mut ans,opt)?;
    Ok(ans.into_inner())
}

/// Convenience function, calls `expand` with a slice returning a Vec
pub fn expand_slice(slice: &[u8],opt: &Options) -> Result<Vec<u8>,DYNERR> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    expand(&mut src,&mut ans,opt)?;
    Ok(ans.into_inner())
}


// *************** TESTS *****************

#[cfg(test)]
use crate::{STDRESULT,STD_OPTIONS};

/// skewed pseudo-random bytes, most of them in a small range
#[cfg(test)]
fn noise(len: usize,seed: u32) -> Vec<u8> {
    let mut x = seed;
    let mut ans = Vec::new();
    for _i in 0..len {
        x = x.wrapping_mul(1103515245).wrapping_add(12345);
        let r = (x >> 16) as u8;
        ans.push(match r % 4 {
            0 => r,
            _ => b'a' + r % 8
        });
    }
    ans
}

#[test]
fn compression_works() {
    let compressed = encode("aabbbcccc".as_bytes()).expect("compression failed");
    assert_eq!(compressed,hex::decode("0361026203630402503C").unwrap());
    let compressed = encode("aaaa".as_bytes()).expect("compression failed");
    assert_eq!(compressed,hex::decode("0161040400").unwrap());
}

#[test]
fn tie_with_branch_container() {
    let container = hex::decode("03610279017A010238").unwrap();
    assert_eq!(decode(&container).expect("expansion failed"),"aayz".as_bytes().to_vec());
    assert_eq!(encode("aayz".as_bytes()).expect("compression failed"),container);
}

#[test]
fn pairs_in_first_appearance_order() {
    let compressed = encode("ba".as_bytes()).expect("compression failed");
    assert_eq!(compressed,hex::decode("02620161010640").unwrap());
    assert_eq!(decode(&compressed).expect("expansion failed"),"ba".as_bytes().to_vec());
}

#[test]
fn invertibility() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let compressed = encode(test_data).expect("compression failed");
    let expanded = decode(&compressed).expect("expansion failed");
    assert_eq!(test_data.to_vec(),expanded);

    let test_data = "aabbbcccc".as_bytes();
    let compressed = encode(test_data).expect("compression failed");
    let expanded = decode(&compressed).expect("expansion failed");
    assert_eq!(test_data.to_vec(),expanded);
}

#[test]
fn shortest_code_for_most_frequent() {
    let coder = Coder::create("aabbbcccc".as_bytes()).expect("compression failed");
    let book = coder.codebook.as_ref().expect("no codebook");
    let c_len = book.get(b'c').expect("no code").len();
    assert!(c_len < book.get(b'a').expect("no code").len());
    assert!(c_len < book.get(b'b').expect("no code").len());
    assert_eq!(coder.usage().expect("usage failed"),10);
    assert_eq!(coder.decode().expect("decode failed"),"aabbbcccc".as_bytes().to_vec());
}

#[test]
fn empty_input() {
    assert_eq!(encode(&[]).expect("compression failed"),Vec::<u8>::new());
    assert_eq!(decode(&[]).expect("expansion failed"),Vec::<u8>::new());
    assert_eq!(Coder::create(&[]).expect("compression failed").usage().expect("usage failed"),0);
}

#[test]
fn single_symbol() {
    for len in [1,4,8,9,1000] {
        let test_data = vec![b'a';len];
        let compressed = encode(&test_data).expect("compression failed");
        assert_eq!(compressed[0..2],[1,b'a']);
        let expanded = decode(&compressed).expect("expansion failed");
        assert_eq!(test_data,expanded);
    }
}

#[test]
fn dense_alphabet() {
    let mut test_data: Vec<u8> = (0..200).collect();
    test_data.append(&mut noise(2000,7));
    let freqs = FrequencyTable::build(&test_data);
    assert!(freqs.distinct() > POSITIONAL_THRESHOLD);
    let compressed = encode(&test_data).expect("compression failed");
    assert_eq!(compressed[0] as usize,usize::min(freqs.distinct(),255));
    let (_,sep) = deserialize_tree(&compressed,0).expect("bad tree");
    assert_eq!(sep,257);
    let expanded = decode(&compressed).expect("expansion failed");
    assert_eq!(test_data,expanded);
}

#[test]
fn full_alphabet() {
    let mut test_data: Vec<u8> = (0..=255).collect();
    test_data.append(&mut (0..=255).rev().collect());
    let compressed = encode(&test_data).expect("compression failed");
    assert_eq!(compressed[0],255);
    assert_eq!(compressed[1..257],[2;256]);
    let expanded = decode(&compressed).expect("expansion failed");
    assert_eq!(test_data,expanded);
}

#[test]
fn invertibility_with_rescale() {
    let mut test_data = vec![b'x';5000];
    test_data.append(&mut "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes().to_vec());
    test_data.append(&mut vec![b'y';700]);
    let coder = Coder::create(&test_data).expect("compression failed");
    assert_eq!(coder.freqs.get(b'x'),255);
    assert!(coder.freqs.get(b'I') >= 1);
    let expanded = decode(&coder.to_bytes().expect("serialize failed")).expect("expansion failed");
    assert_eq!(test_data,expanded);

    let test_data = noise(100000,42);
    let compressed = encode(&test_data).expect("compression failed");
    let expanded = decode(&compressed).expect("expansion failed");
    assert_eq!(test_data,expanded);
}

#[test]
fn tree_section() {
    let mut freqs = FrequencyTable::new();
    freqs.set(b'q',9);
    freqs.set(b'r',255);
    let ser = serialize_tree(&freqs).expect("serialize failed");
    assert_eq!(ser,vec![2,b'q',9,b'r',255]);
    // tree section can start anywhere in the buffer
    let buf = [vec![0xAA,0xBB],ser.clone()].concat();
    let (table,sep) = deserialize_tree(&buf,2).expect("deserialize failed");
    assert_eq!(table,freqs);
    assert_eq!(sep,7);
    freqs.set(b's',256);
    assert!(matches!(serialize_tree(&freqs),Err(Error::FrequencyOverflow)));
}

#[test]
fn bad_containers() {
    let good = hex::decode("0361026203630402503C").unwrap();
    assert!(matches!(decode(&good[0..4]),Err(Error::TruncatedTree)));
    assert!(matches!(decode(&good[0..7]),Err(Error::TruncatedPayload)));
    assert!(matches!(decode(&good[0..8]),Err(Error::TruncatedPayload)));
    // zero frequency in a pair
    assert!(matches!(decode(&hex::decode("0161000400").unwrap()),Err(Error::FileFormatMismatch)));
    // repeated symbol
    assert!(matches!(decode(&hex::decode("02610261030400").unwrap()),Err(Error::FileFormatMismatch)));
    // positional section with the wrong symbol count
    let mut dense = vec![200];
    dense.append(&mut vec![1;100]);
    dense.append(&mut vec![0;156]);
    dense.append(&mut vec![0,0]);
    assert!(matches!(decode(&dense),Err(Error::FileFormatMismatch)));
    assert!(matches!(decode(&[200,1,1]),Err(Error::TruncatedTree)));
    assert!(matches!(decode(&[0,0]),Err(Error::FileFormatMismatch)));
}

#[test]
fn slices() -> STDRESULT {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let compressed = compress_slice(test_data,&STD_OPTIONS)?;
    assert_eq!(compressed,encode(test_data)?);
    let expanded = expand_slice(&compressed,&STD_OPTIONS)?;
    assert_eq!(test_data.to_vec(),expanded);
    Ok(())
}

#[test]
fn offsets() -> STDRESULT {
    let test_data = "HDR:I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let mut opt = STD_OPTIONS;
    opt.in_offset = 4;
    opt.out_offset = 3;
    let mut src = Cursor::new(test_data);
    let mut dst = Cursor::new("XYZ".as_bytes().to_vec());
    let (in_size,out_size) = compress(&mut src,&mut dst,&opt)?;
    assert_eq!(in_size,test_data.len() as u64 - 4);
    let container = dst.into_inner();
    assert_eq!(&container[0..3],"XYZ".as_bytes());
    assert_eq!(out_size,container.len() as u64 - 3);
    assert_eq!(container[3..].to_vec(),encode(&test_data[4..])?);

    opt.in_offset = 3;
    opt.out_offset = 0;
    let mut src = Cursor::new(container.as_slice());
    let mut dst = Cursor::new(Vec::new());
    expand(&mut src,&mut dst,&opt)?;
    assert_eq!(dst.into_inner(),test_data[4..].to_vec());
    Ok(())
}

#[test]
fn size_limit() {
    let mut opt = STD_OPTIONS;
    opt.max_file_size = 16;
    let result = compress_slice(&[b'a';17],&opt);
    assert!(result.is_err());
    assert!(compress_slice(&[b'a';16],&opt).is_ok());
}

#[test]
fn split_files() -> STDRESULT {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let mut tree: Vec<u8> = Vec::new();
    let mut payload: Vec<u8> = Vec::new();
    let (_,out_size) = compress_split(&mut Cursor::new(test_data),&mut tree,&mut payload)?;
    assert_eq!([tree.clone(),payload.clone()].concat(),encode(test_data)?);
    assert_eq!(out_size,(tree.len() + payload.len()) as u64);
    let mut expanded: Vec<u8> = Vec::new();
    expand_split(&mut Cursor::new(&tree),&mut Cursor::new(&payload),&mut expanded)?;
    assert_eq!(test_data.to_vec(),expanded);
    // trailing bytes in the tree stream are rejected
    let mut long_tree = tree.clone();
    long_tree.push(0);
    let mut expanded: Vec<u8> = Vec::new();
    assert!(expand_split(&mut Cursor::new(&long_tree),&mut Cursor::new(&payload),&mut expanded).is_err());
    Ok(())
}
