//! Symbol frequency table.
//! Counts occurrences of every byte value and scales the counts so that
//! each one fits in a single byte of the tree section.

/// largest count that can be serialized
pub const MAX_STORED_FREQ: usize = 255;
/// above this many distinct symbols the tree section is positional
pub const POSITIONAL_THRESHOLD: usize = 127;

/// Count for each of the 256 byte values, 0 means the symbol is absent.
/// Present symbols are remembered in the order they first appeared.
#[derive(Clone,PartialEq,Debug)]
pub struct FrequencyTable {
    counts: Vec<usize>,
    order: Vec<u8>
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self {
            counts: vec![0;256],
            order: Vec::new()
        }
    }
    /// Count the symbols in `dat`, empty input gives an empty table.
    pub fn build(dat: &[u8]) -> Self {
        let mut ans = Self::new();
        ans.accumulate(dat);
        ans
    }
    /// add the symbols in `dat` to the existing counts
    pub fn accumulate(&mut self,dat: &[u8]) {
        for c in dat {
            if self.counts[*c as usize] == 0 {
                self.order.push(*c);
            }
            self.counts[*c as usize] += 1;
        }
    }
    /// Sum counts symbol by symbol, e.g., to combine tables built from separate chunks.
    /// Symbols new to `self` are appended in `other`'s order.
    pub fn merge(&mut self,other: &FrequencyTable) {
        for (c,freq) in other.iter() {
            let curr = self.get(c);
            self.set(c,curr + freq);
        }
    }
    pub fn get(&self,symbol: u8) -> usize {
        self.counts[symbol as usize]
    }
    /// Setting a count of 0 removes the symbol.
    pub fn set(&mut self,symbol: u8,count: usize) {
        let prev = self.counts[symbol as usize];
        if prev == 0 && count > 0 {
            self.order.push(symbol);
        }
        if prev > 0 && count == 0 {
            self.order.retain(|c| *c != symbol);
        }
        self.counts[symbol as usize] = count;
    }
    /// number of symbols with nonzero count
    pub fn distinct(&self) -> usize {
        self.order.len()
    }
    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
    /// Iterate over (symbol,count) for present symbols in order of first appearance.
    pub fn iter(&self) -> impl Iterator<Item = (u8,usize)> + '_ {
        self.order.iter().map(|c| (*c,self.counts[*c as usize]))
    }
    /// Rescale so the largest count is at most 255.
    /// Counts are scaled by `255/max_count` with integer division.  A symbol that is
    /// present never drops to 0, since 0 marks an absent symbol in the tree section.
    pub fn normalize(&self) -> Self {
        let max_freq = self.max_count();
        if max_freq <= MAX_STORED_FREQ {
            return self.clone();
        }
        log::debug!("rescale {} symbols, max count {}",self.distinct(),max_freq);
        let mut ans = Self::new();
        for (c,freq) in self.iter() {
            ans.set(c,usize::max(MAX_STORED_FREQ * freq / max_freq,1));
        }
        ans
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}

#[test]
fn counting() {
    let table = FrequencyTable::build("aabbbcccc".as_bytes());
    assert_eq!(table.distinct(),3);
    assert_eq!(table.get(b'a'),2);
    assert_eq!(table.get(b'b'),3);
    assert_eq!(table.get(b'c'),4);
    assert_eq!(table.get(b'd'),0);
    assert_eq!(table.max_count(),4);
    let pairs: Vec<(u8,usize)> = table.iter().collect();
    assert_eq!(pairs,vec![(b'a',2),(b'b',3),(b'c',4)]);
}

#[test]
fn first_appearance_order() {
    let mut table = FrequencyTable::build("zzyaz".as_bytes());
    let pairs: Vec<(u8,usize)> = table.iter().collect();
    assert_eq!(pairs,vec![(b'z',3),(b'y',1),(b'a',1)]);
    table.set(b'y',0);
    table.set(b'b',5);
    let pairs: Vec<(u8,usize)> = table.iter().collect();
    assert_eq!(pairs,vec![(b'z',3),(b'a',1),(b'b',5)]);
    assert_eq!(table.distinct(),3);
    // scaling keeps the order
    let mut dat = vec![b'q';600];
    dat.append(&mut vec![b'b';300]);
    let pairs: Vec<(u8,usize)> = FrequencyTable::build(&dat).normalize().iter().collect();
    assert_eq!(pairs,vec![(b'q',255),(b'b',127)]);
}

#[test]
fn empty_input() {
    let table = FrequencyTable::build(&[]);
    assert!(table.is_empty());
    assert_eq!(table.max_count(),0);
    assert_eq!(table.normalize(),table);
}

#[test]
fn merge_matches_whole() {
    let dat = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let mut table = FrequencyTable::build(&dat[0..20]);
    table.merge(&FrequencyTable::build(&dat[20..]));
    assert_eq!(table,FrequencyTable::build(dat));
}

#[test]
fn small_counts_untouched() {
    let mut dat = vec![b'x';255];
    dat.push(b'y');
    let table = FrequencyTable::build(&dat);
    assert_eq!(table.normalize(),table);
}

#[test]
fn rescale_sparse() {
    let mut dat = vec![b'a';300];
    dat.push(b'b');
    dat.append(&mut vec![b'c';150]);
    let table = FrequencyTable::build(&dat).normalize();
    assert_eq!(table.get(b'a'),255);
    assert_eq!(table.get(b'b'),1);
    assert_eq!(table.get(b'c'),127);
    assert_eq!(table.distinct(),3);
}

#[test]
fn rescale_dense_keeps_every_symbol() {
    let mut dat: Vec<u8> = (0..200).map(|x| x as u8).collect();
    dat.append(&mut vec![7;1000]);
    let table = FrequencyTable::build(&dat).normalize();
    assert_eq!(table.distinct(),200);
    assert_eq!(table.get(7),255);
    assert_eq!(table.get(0),1);
    assert!(table.max_count() <= MAX_STORED_FREQ);
}
