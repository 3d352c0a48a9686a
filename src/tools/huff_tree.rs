//! Module to build the static Huffman tree and its codebook.
//! This is used by the `static_huff` module.
//!
//! The nodes are kept in an arena and refer to their children by index.
//! Leaves are pushed first, each merge pushes a new branch, so the root is
//! always the last node in the arena.

use bit_vec::BitVec;
use std::cmp::{Ordering,Reverse};
use std::collections::BinaryHeap;
use crate::tools::freq_table::FrequencyTable;
use crate::Error;

/// A leaf (no children) or a branch (children, symbol fixed at 0)
#[derive(Clone,PartialEq,Debug)]
pub struct Node {
    /// for a branch this is the sum of the children
    pub freq: usize,
    /// the leaf's symbol, always 0 for a branch, which matters when breaking ties
    pub symbol: u8,
    /// [left,right] indices into the arena, None for a leaf
    pub kids: Option<[usize;2]>
}

/// Sorting key for the heap.
/// `spine` holds the symbols met going down the right children, starting with the node itself.
/// Ties in frequency are broken by descending both spines in lockstep until either one
/// reaches a leaf, and comparing the symbols there.  A branch carries symbol 0, so it ties
/// with the leaf for symbol 0, in which case the earlier node in the arena wins.
#[derive(Clone,Debug)]
struct Rank {
    freq: usize,
    spine: Vec<u8>,
    idx: usize
}

impl Ord for Rank {
    fn cmp(&self,other: &Self) -> Ordering {
        let depth = usize::min(self.spine.len(),other.spine.len()) - 1;
        self.freq.cmp(&other.freq)
            .then(self.spine[depth].cmp(&other.spine[depth]))
            .then(self.idx.cmp(&other.idx))
    }
}

impl PartialOrd for Rank {
    fn partial_cmp(&self,other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Rank {
    fn eq(&self,other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Rank {}

/// Map from symbols to codewords, a codeword is the path from root to leaf
/// with 0 for left and 1 for right.
#[derive(Clone,PartialEq,Debug)]
pub struct Codebook {
    codes: Vec<Option<BitVec>>
}

#[derive(Clone,PartialEq,Debug)]
pub struct Tree {
    nodes: Vec<Node>
}

impl Node {
    fn leaf(symbol: u8,freq: usize) -> Self {
        Self {
            freq,
            symbol,
            kids: None
        }
    }
    fn branch(left: usize,right: usize,freq: usize) -> Self {
        Self {
            freq,
            symbol: 0,
            kids: Some([left,right])
        }
    }
    pub fn is_leaf(&self) -> bool {
        self.kids.is_none()
    }
}

impl Codebook {
    fn new() -> Self {
        Self {
            codes: vec![None;256]
        }
    }
    pub fn get(&self,symbol: u8) -> Option<&BitVec> {
        self.codes[symbol as usize].as_ref()
    }
    /// iterate over (symbol,codeword) in ascending symbol order
    pub fn iter(&self) -> impl Iterator<Item = (u8,&BitVec)> + '_ {
        self.codes.iter().enumerate().filter_map(|(c,code)| code.as_ref().map(|x| (c as u8,x)))
    }
    /// number of symbols with a codeword
    pub fn len(&self) -> usize {
        self.codes.iter().filter(|x| x.is_some()).count()
    }
}

impl Tree {
    /// Build the tree from a frequency table.
    /// The two lowest ranked nodes are merged, the first one popped goes on the right.
    /// The table must not be empty, callers should skip empty input before getting here.
    pub fn build(freqs: &FrequencyTable) -> Result<Self,Error> {
        let mut tree = Self {
            nodes: Vec::new()
        };
        let mut heap: BinaryHeap<Reverse<Rank>> = BinaryHeap::new();
        for (symbol,freq) in freqs.iter() {
            tree.nodes.push(Node::leaf(symbol,freq));
            heap.push(Reverse(tree.rank(tree.len()-1)));
        }
        if tree.is_empty() {
            log::error!("cannot build a tree with no symbols");
            return Err(Error::FileFormatMismatch);
        }
        while let Some(Reverse(right)) = heap.pop() {
            let left = match heap.pop() {
                Some(Reverse(left)) => left,
                None => break
            };
            tree.nodes.push(Node::branch(left.idx,right.idx,left.freq + right.freq));
            let rank = tree.rank(tree.len()-1);
            log::trace!("merge {} and {} into {} with freq {}",left.idx,right.idx,rank.idx,rank.freq);
            heap.push(Reverse(rank));
        }
        log::debug!("tree has {} nodes, {} leaves",tree.len(),tree.leaf_count());
        Ok(tree)
    }
    /// symbols of the node and of each right child below it
    fn spine(&self,mut idx: usize) -> Vec<u8> {
        let mut ans = vec![self.nodes[idx].symbol];
        while let Some([_,right]) = self.nodes[idx].kids {
            idx = right;
            ans.push(self.nodes[idx].symbol);
        }
        ans
    }
    fn rank(&self,idx: usize) -> Rank {
        Rank {
            freq: self.nodes[idx].freq,
            spine: self.spine(idx),
            idx
        }
    }
    /// Order two nodes the way the heap orders them.
    #[cfg(test)]
    fn compare(&self,a: usize,b: usize) -> Ordering {
        self.rank(a).cmp(&self.rank(b))
    }
    pub fn root(&self) -> usize {
        self.nodes.len() - 1
    }
    pub fn node(&self,idx: usize) -> &Node {
        &self.nodes[idx]
    }
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|x| x.is_leaf()).count()
    }
    /// With only one distinct symbol the root is a leaf and its codeword is empty.
    pub fn is_single_leaf(&self) -> bool {
        self.nodes.len() == 1
    }
    /// Derive the codebook.  Each stack entry carries its own copy of the path,
    /// extended by one bit on the way down.
    pub fn codebook(&self) -> Codebook {
        let mut ans = Codebook::new();
        let mut stack: Vec<(usize,BitVec)> = vec![(self.root(),BitVec::new())];
        while let Some((idx,path)) = stack.pop() {
            match self.nodes[idx].kids {
                None => {
                    log::trace!("symbol {} has {} bit code",self.nodes[idx].symbol,path.len());
                    ans.codes[self.nodes[idx].symbol as usize] = Some(path);
                },
                Some([left,right]) => {
                    let mut rpath = path.clone();
                    rpath.push(true);
                    let mut lpath = path;
                    lpath.push(false);
                    stack.push((right,rpath));
                    stack.push((left,lpath));
                }
            }
        }
        ans
    }
    /// Walk the tree from the root for every bit, emitting a symbol at each leaf.
    /// For a single leaf tree each bit stands for one occurrence of the symbol.
    /// Running out of bits in the middle of a codeword is an error.
    pub fn walk(&self,bits: &BitVec) -> Result<Vec<u8>,Error> {
        let mut ans = Vec::new();
        let root = self.root();
        if self.is_single_leaf() {
            let symbol = self.nodes[root].symbol;
            for bit in bits.iter() {
                if bit {
                    log::error!("unexpected set bit in single symbol stream");
                    return Err(Error::FileFormatMismatch);
                }
                ans.push(symbol);
            }
            return Ok(ans);
        }
        let mut curs = root;
        for bit in bits.iter() {
            curs = match self.nodes[curs].kids {
                Some(kids) => kids[bit as usize],
                None => return Err(Error::FileFormatMismatch)
            };
            if self.nodes[curs].is_leaf() {
                ans.push(self.nodes[curs].symbol);
                curs = root;
            }
        }
        if curs != root {
            log::error!("bit stream ended inside a codeword");
            return Err(Error::TruncatedPayload);
        }
        Ok(ans)
    }
}

#[cfg(test)]
fn bits(s: &str) -> BitVec {
    s.chars().map(|c| c=='1').collect()
}

#[test]
fn codebook_works() {
    let tree = Tree::build(&FrequencyTable::build("aabbbcccc".as_bytes())).expect("build failed");
    let book = tree.codebook();
    assert_eq!(book.len(),3);
    assert_eq!(book.get(b'c'),Some(&bits("1")));
    assert_eq!(book.get(b'b'),Some(&bits("00")));
    assert_eq!(book.get(b'a'),Some(&bits("01")));
    assert_eq!(book.get(b'd'),None);
    assert_eq!(tree.node(tree.root()).freq,9);
}

#[test]
fn ties_between_leaves() {
    let tree = Tree::build(&FrequencyTable::build("xyz".as_bytes())).expect("build failed");
    let book = tree.codebook();
    assert_eq!(book.get(b'z'),Some(&bits("1")));
    assert_eq!(book.get(b'y'),Some(&bits("00")));
    assert_eq!(book.get(b'x'),Some(&bits("01")));
    // leaves are 0,1,2 ('x','y','z'), branch 3 holds 'y' and 'x'
    assert_eq!(tree.compare(0,1),Ordering::Less);
    assert_eq!(tree.compare(2,1),Ordering::Greater);
    assert_eq!(tree.compare(3,2),Ordering::Greater);
    assert_eq!(tree.compare(3,3),Ordering::Equal);
}

#[test]
fn leaf_ties_with_branch() {
    // after merging 'y' and 'z' the branch ties with 'a' and goes first
    let tree = Tree::build(&FrequencyTable::build("aayz".as_bytes())).expect("build failed");
    let book = tree.codebook();
    assert_eq!(book.get(b'a'),Some(&bits("0")));
    assert_eq!(book.get(b'z'),Some(&bits("10")));
    assert_eq!(book.get(b'y'),Some(&bits("11")));
    assert_eq!(tree.compare(3,0),Ordering::Less);

    let tree = Tree::build(&FrequencyTable::build("abcdcd".as_bytes())).expect("build failed");
    let book = tree.codebook();
    assert_eq!(book.get(b'd'),Some(&bits("1")));
    assert_eq!(book.get(b'c'),Some(&bits("00")));
    assert_eq!(book.get(b'b'),Some(&bits("010")));
    assert_eq!(book.get(b'a'),Some(&bits("011")));
}

#[test]
fn branch_ties_with_deeper_branch() {
    // the deeper branch reaches a branch where the other reaches leaf 'a', and the branch goes first
    let tree = Tree::build(&FrequencyTable::build("aabbwxyz".as_bytes())).expect("build failed");
    let book = tree.codebook();
    assert_eq!(book.get(b'b'),Some(&bits("00")));
    assert_eq!(book.get(b'a'),Some(&bits("01")));
    assert_eq!(book.get(b'z'),Some(&bits("100")));
    assert_eq!(book.get(b'y'),Some(&bits("101")));
    assert_eq!(book.get(b'x'),Some(&bits("110")));
    assert_eq!(book.get(b'w'),Some(&bits("111")));
}

#[test]
fn symbol_zero_ties_with_branch() {
    // leaf 0 and a branch compare equal, the earlier node goes first
    let dat = [0,0,1,2];
    let tree = Tree::build(&FrequencyTable::build(&dat)).expect("build failed");
    assert_eq!(tree.compare(0,3),Ordering::Less);
    let book = tree.codebook();
    assert_eq!(book.get(0),Some(&bits("1")));
    assert_eq!(book.get(2),Some(&bits("00")));
    assert_eq!(book.get(1),Some(&bits("01")));
    assert_eq!(tree.walk(&bits("110001")).expect("walk failed"),vec![0,0,2,1]);
}

#[test]
fn shape() {
    let dat = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let freqs = FrequencyTable::build(dat);
    let tree = Tree::build(&freqs).expect("build failed");
    assert_eq!(tree.leaf_count(),freqs.distinct());
    assert_eq!(tree.len(),2*freqs.distinct()-1);
    assert_eq!(tree.node(tree.root()).freq,dat.len());
}

#[test]
fn prefix_free() {
    let dat = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let book = Tree::build(&FrequencyTable::build(dat)).expect("build failed").codebook();
    for (c1,code1) in book.iter() {
        for (c2,code2) in book.iter() {
            if c1==c2 {
                continue;
            }
            let is_prefix = code1.len() <= code2.len() && (0..code1.len()).all(|i| code1.get(i)==code2.get(i));
            assert!(!is_prefix,"code for {} is a prefix of code for {}",c1,c2);
        }
    }
}

#[test]
fn deterministic() {
    let mut dat: Vec<u8> = (0..=255).collect();
    dat.append(&mut (0..=255).rev().collect());
    dat.append(&mut "ABABABCCD".as_bytes().to_vec());
    let freqs = FrequencyTable::build(&dat);
    let tree1 = Tree::build(&freqs).expect("build failed");
    let tree2 = Tree::build(&freqs.clone()).expect("build failed");
    assert_eq!(tree1,tree2);
    assert_eq!(tree1.codebook(),tree2.codebook());
}

#[test]
fn single_leaf() {
    let tree = Tree::build(&FrequencyTable::build("aaaa".as_bytes())).expect("build failed");
    assert!(tree.is_single_leaf());
    assert_eq!(tree.codebook().get(b'a'),Some(&BitVec::new()));
    assert_eq!(tree.walk(&bits("000")).expect("walk failed"),"aaa".as_bytes().to_vec());
    assert!(tree.walk(&bits("010")).is_err());
}

#[test]
fn empty_table() {
    assert!(Tree::build(&FrequencyTable::new()).is_err());
}

#[test]
fn walk_works() {
    let tree = Tree::build(&FrequencyTable::build("aabbbcccc".as_bytes())).expect("build failed");
    assert_eq!(tree.walk(&bits("0100111")).expect("walk failed"),"abccc".as_bytes().to_vec());
    assert!(matches!(tree.walk(&bits("010")),Err(Error::TruncatedPayload)));
}
