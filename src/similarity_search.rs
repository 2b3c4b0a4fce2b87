use crate::errors::Result;
use ndarray::{Array1, ArrayView1};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Above this many entries the scan runs on the rayon pool
const PARALLEL_THRESHOLD: usize = 100;

/// Entry in the flat index
#[derive(Debug, Clone)]
pub struct VectorEntry {
    pub vector: Array1<f32>,
    pub norm_squared: f32,
}

/// Search hit: position in insertion order and squared L2 distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub index: usize,
    pub distance: f32,
}

impl SearchHit {
    /// Score shown to users
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}

impl Eq for SearchHit {}

impl PartialOrd for SearchHit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchHit {
    // Largest distance on top of the heap so it can be evicted
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.index.cmp(&other.index))
    }
}

/// Exhaustive squared-L2 index over fixed-dimension vectors
#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Vec<VectorEntry>,
    dimension: usize,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            entries: Vec::new(),
            dimension,
        }
    }

    /// Build an index from rows that must all have the same length
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let dimension = rows
            .first()
            .map(|r| r.len())
            .ok_or_else(|| crate::vector_error!("cannot build an index from zero vectors"))?;
        let mut index = Self::new(dimension);
        for row in rows {
            index.add(Array1::from(row))?;
        }
        Ok(index)
    }

    pub fn add(&mut self, vector: Array1<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(crate::validation_error!(
                "vector dimension",
                vector.len(),
                self.dimension
            ));
        }
        let norm_squared = vector.dot(&vector);
        self.entries.push(VectorEntry {
            vector,
            norm_squared,
        });
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn vector(&self, index: usize) -> Option<&Array1<f32>> {
        self.entries.get(index).map(|e| &e.vector)
    }

    pub fn vectors(&self) -> impl Iterator<Item = &Array1<f32>> {
        self.entries.iter().map(|e| &e.vector)
    }

    /// k nearest entries, closest first. `k` past the end returns everything.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(crate::validation_error!(
                "query dimension",
                query.len(),
                self.dimension
            ));
        }
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query = ArrayView1::from(query);
        let query_norm_squared = query.dot(&query);

        if self.entries.len() > PARALLEL_THRESHOLD {
            Ok(self.parallel_search(query, query_norm_squared, k))
        } else {
            Ok(self.sequential_search(query, query_norm_squared, k))
        }
    }

    /// Bounded max-heap scan
    fn sequential_search(&self, query: ArrayView1<f32>, query_norm_squared: f32, k: usize) -> Vec<SearchHit> {
        let mut heap = BinaryHeap::with_capacity(k + 1);

        for (index, entry) in self.entries.iter().enumerate() {
            let hit = SearchHit {
                index,
                distance: squared_distance(query, query_norm_squared, entry),
            };
            if heap.len() < k {
                heap.push(hit);
            } else if heap.peek().map(|worst| hit < *worst).unwrap_or(false) {
                heap.pop();
                heap.push(hit);
            }
        }

        heap.into_sorted_vec()
    }

    fn parallel_search(&self, query: ArrayView1<f32>, query_norm_squared: f32, k: usize) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self
            .entries
            .par_iter()
            .enumerate()
            .map(|(index, entry)| SearchHit {
                index,
                distance: squared_distance(query, query_norm_squared, entry),
            })
            .collect();

        hits.par_sort_unstable();
        hits.truncate(k);
        hits
    }
}

/// |q|^2 + |v|^2 - 2 q.v, clamped at zero against rounding
fn squared_distance(query: ArrayView1<f32>, query_norm_squared: f32, entry: &VectorEntry) -> f32 {
    let dot = query.dot(&entry.vector);
    (query_norm_squared + entry.norm_squared - 2.0 * dot).max(0.0)
}
