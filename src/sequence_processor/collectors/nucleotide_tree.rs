use crate::error::{Result, ValidationError};
use crate::utils::nucleotide::{base_index, BASES};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Child slot value meaning "not observed yet". The root lives at index 0
/// and is never anybody's child, so 0 is free to use as the sentinel.
const NO_CHILD: u32 = 0;
const ROOT: usize = 0;

pub const DOMINANT_MIN_TOTAL: u64 = 50;
pub const DOMINANT_RATIO: f64 = 0.95;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Node {
    children: [u32; 5],
    count: u64,
    /// Hits by the read cycle the probe started at.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    starts: Vec<u64>,
}

/// Prefix tree over A/C/G/T/other, stored as an arena of nodes addressed by
/// index. Only the terminal node of an inserted probe is counted.
///
/// Children are always allocated after their parent, so walking the arena
/// backwards visits every child before its parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrepresentationTree {
    depth: usize,
    nodes: Vec<Node>,
    hits: u64,
}

impl OverrepresentationTree {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            nodes: vec![Node::default()],
            hits: 0,
        }
    }

    /// Probe length this tree was configured for.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of probes inserted.
    pub fn total_hits(&self) -> u64 {
        self.hits
    }

    pub fn is_empty(&self) -> bool {
        self.hits == 0
    }

    /// Count a probe with no known read position.
    pub fn insert(&mut self, probe: &[u8]) {
        self.terminal(probe);
    }

    /// Count a probe taken from a read at 0-based cycle `start`.
    pub fn insert_at(&mut self, probe: &[u8], start: usize) {
        let node = self.terminal(probe);
        add_at(&mut self.nodes[node].starts, start, 1);
    }

    fn terminal(&mut self, probe: &[u8]) -> usize {
        let mut node = ROOT;
        for &base in probe {
            node = self.child_or_insert(node, base_index(base));
        }
        self.nodes[node].count += 1;
        self.hits += 1;
        node
    }

    fn child_or_insert(&mut self, node: usize, slot: usize) -> usize {
        let child = self.nodes[node].children[slot];
        if child != NO_CHILD {
            return child as usize;
        }
        let idx = self.nodes.len();
        self.nodes.push(Node::default());
        self.nodes[node].children[slot] = idx as u32;
        idx
    }

    fn find(&self, path: &[u8]) -> Option<usize> {
        path.iter().try_fold(ROOT, |node, &base| {
            match self.nodes[node].children[base_index(base)] {
                NO_CHILD => None,
                child => Some(child as usize),
            }
        })
    }

    /// Hits recorded for exactly this path.
    pub fn count(&self, path: &[u8]) -> u64 {
        self.find(path).map_or(0, |node| self.nodes[node].count)
    }

    /// Start-cycle histogram of this path; index `i` counts hits that began
    /// at cycle `i`. Empty when the path was never inserted with a position.
    pub fn positions(&self, path: &[u8]) -> &[u64] {
        self.find(path)
            .map_or(&[][..], |node| self.nodes[node].starts.as_slice())
    }

    /// Number of paths with at least one hit.
    pub fn distinct_paths(&self) -> usize {
        self.nodes.iter().filter(|n| n.count > 0).count()
    }

    /// Add `other`'s counts path by path, creating nodes missing here.
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        if self.depth != other.depth {
            return Err(ValidationError::IncompatibleConfig {
                field: "probe_lengths",
            }
            .into());
        }

        let mut stack = vec![(ROOT, ROOT)];
        while let Some((mine, theirs)) = stack.pop() {
            self.nodes[mine].count += other.nodes[theirs].count;
            for (cycle, &n) in other.nodes[theirs].starts.iter().enumerate() {
                add_at(&mut self.nodes[mine].starts, cycle, n);
            }
            for slot in 0..BASES.len() {
                let child = other.nodes[theirs].children[slot];
                if child != NO_CHILD {
                    let target = self.child_or_insert(mine, slot);
                    stack.push((target, child as usize));
                }
            }
        }
        self.hits += other.hits;
        Ok(())
    }

    /// Every counted path with its hits, in no particular order.
    pub fn paths(&self) -> Vec<(Vec<u8>, u64)> {
        let mut out = Vec::new();
        let mut stack = vec![(ROOT, Vec::new())];
        while let Some((node, path)) = stack.pop() {
            if self.nodes[node].count > 0 {
                out.push((path.clone(), self.nodes[node].count));
            }
            for (slot, &child) in self.nodes[node].children.iter().enumerate() {
                if child != NO_CHILD {
                    let mut next = path.clone();
                    next.push(BASES[slot]);
                    stack.push((child as usize, next));
                }
            }
        }
        out
    }

    /// Counted paths with their start histograms, sorted by path.
    fn entries(&self) -> Vec<(Vec<u8>, u64, &[u64])> {
        let mut out: Vec<_> = self
            .paths()
            .into_iter()
            .map(|(path, count)| {
                let starts = self.positions(&path);
                (path, count, starts)
            })
            .collect();
        out.sort();
        out
    }

    /// Up to `n` paths by descending hit count; equal counts come out in
    /// lexicographic order of the path.
    pub fn top_n(&self, n: usize) -> RankedPaths {
        let heap = self
            .paths()
            .into_iter()
            .map(|(path, count)| Ranked { count, path })
            .collect();
        RankedPaths { heap, remaining: n }
    }

    /// Longest prefix where, level by level, one child holds at least
    /// `ratio` of the hits below the current node and those hits number at
    /// least `min_total`.
    pub fn dominant_path(&self, min_total: u64, ratio: f64) -> String {
        let mut subtree = vec![0u64; self.nodes.len()];
        for idx in (0..self.nodes.len()).rev() {
            let below: u64 = self.nodes[idx]
                .children
                .iter()
                .filter(|&&c| c != NO_CHILD)
                .map(|&c| subtree[c as usize])
                .sum();
            subtree[idx] = self.nodes[idx].count + below;
        }

        let mut path = String::new();
        let mut node = ROOT;
        loop {
            let children = self.nodes[node].children;
            let total: u64 = children
                .iter()
                .filter(|&&c| c != NO_CHILD)
                .map(|&c| subtree[c as usize])
                .sum();
            if total == 0 || total < min_total {
                break;
            }
            let dominant = children.iter().enumerate().find(|&(_, &c)| {
                c != NO_CHILD && subtree[c as usize] as f64 / total as f64 >= ratio
            });
            match dominant {
                Some((slot, &child)) => {
                    path.push(BASES[slot] as char);
                    node = child as usize;
                }
                None => break,
            }
        }
        path
    }
}

/// Two trees are equal when they hold the same counted paths, whatever the
/// arena layout produced by their insertion or merge order.
impl PartialEq for OverrepresentationTree {
    fn eq(&self, other: &Self) -> bool {
        if self.depth != other.depth || self.hits != other.hits {
            return false;
        }
        self.entries() == other.entries()
    }
}

fn add_at(hist: &mut Vec<u64>, idx: usize, n: u64) {
    if n == 0 {
        return;
    }
    if hist.len() <= idx {
        hist.resize(idx + 1, 0);
    }
    hist[idx] += n;
}

#[derive(Debug, PartialEq, Eq)]
struct Ranked {
    count: u64,
    path: Vec<u8>,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        // max-heap: higher count first, then the smaller path
        self.count
            .cmp(&other.count)
            .then_with(|| other.path.cmp(&self.path))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ranked extraction from [`OverrepresentationTree::top_n`]. Consumed as it
/// is iterated.
pub struct RankedPaths {
    heap: BinaryHeap<Ranked>,
    remaining: usize,
}

impl Iterator for RankedPaths {
    type Item = (String, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let ranked = self.heap.pop()?;
        self.remaining -= 1;
        Some((String::from_utf8_lossy(&ranked.path).into_owned(), ranked.count))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.min(self.heap.len());
        (n, Some(n))
    }
}
