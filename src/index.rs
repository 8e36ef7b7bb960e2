//! Similarity index seam and a local in-memory implementation.
//!
//! Production runs query a hosted vector database; the trait keeps the
//! aggregator independent of which index is behind it. `InMemoryIndex`
//! stores catalog-item embeddings and does cosine similarity search
//! with an optional category filter, enough to exercise the pipeline
//! end-to-end without external services.

use crate::candidates::RawMatch;

/// Furniture types that are close enough to satisfy a category filter.
/// A loveseat can stand in for either a sofa or a chair; sofas and
/// chairs never match each other.
const CATEGORY_GROUPS: &[&[&str]] = &[
    &["sofa", "loveseat"],
    &["chair", "armchair", "loveseat"],
    &["table", "nightstand", "coffee table", "side table"],
    &["lighting", "lamp", "pendant", "sconce"],
    &["bench", "ottoman", "storage bench"],
    &["rug"],
];

/// Whether an indexed item's category satisfies a requested one.
pub fn same_category(item_category: &str, target_category: &str) -> bool {
    let item = item_category.to_lowercase();
    let target = target_category.to_lowercase();
    if item == target {
        return true;
    }
    CATEGORY_GROUPS.iter().any(|group| {
        group.contains(&item.as_str()) && group.contains(&target.as_str())
    })
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("cannot store or search with a zero-norm vector")]
    ZeroNormVector,
}

/// Query seam consumed by the aggregation pipeline.
pub trait SimilarityIndex {
    /// Return the `top_k` most similar items, optionally restricted to
    /// a furniture category, ordered by descending score.
    fn search(
        &self,
        query: &[f32],
        category: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<RawMatch>, IndexError>;
}

#[derive(Debug, Clone)]
struct IndexEntry {
    item_id: String,
    category: String,
    embedding: Vec<f32>,
    norm: f32,
}

/// In-memory cosine-similarity index over catalog-item embeddings.
pub struct InMemoryIndex {
    entries: Vec<IndexEntry>,
    dimensions: usize,
}

impl InMemoryIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            entries: Vec::new(),
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace an item's embedding. Rejects wrong dimensions
    /// and zero-norm vectors.
    pub fn insert(
        &mut self,
        item_id: impl Into<String>,
        category: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Result<(), IndexError> {
        if embedding.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: embedding.len(),
            });
        }
        let norm = l2_norm(&embedding);
        if norm < f32::EPSILON {
            return Err(IndexError::ZeroNormVector);
        }

        let item_id = item_id.into();
        let category = category.into();
        self.entries
            .retain(|e| !(e.item_id == item_id && e.category == category));
        self.entries.push(IndexEntry {
            item_id,
            category,
            embedding,
            norm,
        });
        Ok(())
    }
}

impl SimilarityIndex for InMemoryIndex {
    fn search(
        &self,
        query: &[f32],
        category: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<RawMatch>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }
        let query_norm = l2_norm(query);
        if query_norm < f32::EPSILON {
            return Err(IndexError::ZeroNormVector);
        }

        let mut results: Vec<RawMatch> = self
            .entries
            .iter()
            .filter(|entry| {
                category
                    .map(|target| same_category(&entry.category, target))
                    .unwrap_or(true)
            })
            .map(|entry| {
                let dot: f32 = query
                    .iter()
                    .zip(entry.embedding.iter())
                    .map(|(a, b)| a * b)
                    .sum();
                // cosine can dip slightly negative; downstream scores
                // live in [0, 1]
                let score = (dot / (query_norm * entry.norm)).clamp(0.0, 1.0);
                RawMatch {
                    item_id: entry.item_id.clone(),
                    category: entry.category.clone(),
                    similarity_score: score,
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.similarity_score
                .total_cmp(&a.similarity_score)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        results.truncate(top_k);

        Ok(results)
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
