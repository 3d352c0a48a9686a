//! Pack a bit stream into bytes and back.
//!
//! The first byte of a packed stream is the number of padding bits (0-7)
//! at the end of the last byte.  Bits are packed MSB first.

use bit_vec::BitVec;
use crate::Error;

/// Pack `bits` behind a padding count byte.  Nothing to pack gives no bytes at all.
pub fn pack(bits: &BitVec) -> Vec<u8> {
    if bits.is_empty() {
        return Vec::new();
    }
    let n_pad = (8 - bits.len() % 8) % 8;
    log::trace!("pack {} bits with {} padding",bits.len(),n_pad);
    let mut ans = vec![n_pad as u8];
    // bit_vec fills the last byte with zeros
    ans.append(&mut bits.to_bytes());
    ans
}

/// Unpack bytes produced by `pack`, the padding bits are dropped.
pub fn unpack(bytes: &[u8]) -> Result<BitVec,Error> {
    if bytes.is_empty() {
        return Ok(BitVec::new());
    }
    let n_pad = bytes[0] as usize;
    if n_pad > 7 {
        log::error!("padding count {} is out of range",n_pad);
        return Err(Error::BadPadding);
    }
    if bytes.len() < 2 {
        log::error!("packed stream has no data bytes");
        return Err(Error::TruncatedPayload);
    }
    let mut ans = BitVec::from_bytes(&bytes[1..]);
    ans.truncate(ans.len() - n_pad);
    Ok(ans)
}

#[cfg(test)]
fn bits(s: &str) -> BitVec {
    s.chars().map(|c| c=='1').collect()
}

#[test]
fn packing_works() {
    assert_eq!(pack(&bits("01010000001111")),hex::decode("02503C").unwrap());
    assert_eq!(pack(&bits("11111111")),hex::decode("00FF").unwrap());
    assert_eq!(pack(&bits("1")),hex::decode("0780").unwrap());
    assert_eq!(pack(&BitVec::new()),Vec::<u8>::new());
}

#[test]
fn unpacking_works() {
    assert_eq!(unpack(&hex::decode("02503C").unwrap()).expect("unpack failed"),bits("01010000001111"));
    assert_eq!(unpack(&hex::decode("0780").unwrap()).expect("unpack failed"),bits("1"));
    assert_eq!(unpack(&[]).expect("unpack failed"),BitVec::new());
}

#[test]
fn invertibility() {
    let patterns = ["0","10","1101001","00000000","101100111","1111000011110000101"];
    for p in patterns {
        assert_eq!(unpack(&pack(&bits(p))).expect("unpack failed"),bits(p));
    }
}

#[test]
fn bad_streams() {
    assert!(matches!(unpack(&[8,0]),Err(Error::BadPadding)));
    assert!(matches!(unpack(&[3]),Err(Error::TruncatedPayload)));
}
