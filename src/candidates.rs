//! Candidate items and per-category candidate set normalization.
//!
//! Raw similarity matches are grouped by category, deduplicated,
//! score-sorted, truncated to the top K per category and priced. The
//! truncation is a deliberate precision/performance trade-off: the
//! optimizer enumerates a cross-product over these lists, so K bounds
//! the search space.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::pricing::{Price, PriceResolver, PriceSource, PricingError};

/// One row of similarity-index output.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatch {
    pub item_id: String,
    pub category: String,
    pub similarity_score: f32,
}

/// An item considered for inclusion in a combination. Validated at
/// construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateItem {
    item_id: String,
    category: String,
    similarity_score: f32,
    price: Price,
    source: PriceSource,
}

impl CandidateItem {
    pub fn new(
        item_id: impl Into<String>,
        category: impl Into<String>,
        similarity_score: f32,
        price: Price,
        source: PriceSource,
    ) -> Result<Self, NormalizeError> {
        let item_id = item_id.into();
        let category = category.into();

        if item_id.is_empty() {
            return Err(NormalizeError::InvalidInput("empty item id".into()));
        }
        if category.is_empty() {
            return Err(NormalizeError::InvalidInput("empty category".into()));
        }
        if !similarity_score.is_finite() || !(0.0..=1.0).contains(&similarity_score) {
            return Err(NormalizeError::InvalidInput(format!(
                "similarity score {similarity_score} for '{item_id}' is outside [0, 1]"
            )));
        }

        Ok(Self {
            item_id,
            category,
            similarity_score,
            price,
            source,
        })
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn similarity_score(&self) -> f32 {
        self.similarity_score
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn source(&self) -> PriceSource {
        self.source
    }
}

/// Category name -> candidates ordered by descending similarity.
///
/// A `BTreeMap` keeps categories in a fixed alphabetical order, which
/// the optimizer relies on for deterministic enumeration.
pub type CategoryCandidateSet = BTreeMap<String, Vec<CandidateItem>>;

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("no candidates remain after normalization")]
    EmptyCandidateSet,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Build a normalized candidate set from raw similarity matches.
///
/// - groups by (lowercased) category;
/// - deduplicates by item id, keeping the highest score;
/// - sorts by descending score, ties by ascending item id;
/// - truncates each category to `max_per_category`;
/// - resolves every retained candidate's price.
pub fn normalize(
    raw_matches: &[RawMatch],
    resolver: &PriceResolver,
    max_per_category: usize,
) -> Result<CategoryCandidateSet, NormalizeError> {
    if max_per_category == 0 {
        return Err(NormalizeError::InvalidInput(
            "max candidates per category must be positive".into(),
        ));
    }

    let mut grouped: BTreeMap<String, HashMap<String, f32>> = BTreeMap::new();
    for raw in raw_matches {
        if raw.item_id.is_empty() || raw.category.is_empty() {
            return Err(NormalizeError::InvalidInput(
                "match with empty item id or category".into(),
            ));
        }
        if !raw.similarity_score.is_finite() || !(0.0..=1.0).contains(&raw.similarity_score) {
            return Err(NormalizeError::InvalidInput(format!(
                "similarity score {} for '{}' is outside [0, 1]",
                raw.similarity_score, raw.item_id
            )));
        }

        let by_id = grouped.entry(raw.category.to_lowercase()).or_default();
        let best = by_id.entry(raw.item_id.clone()).or_insert(f32::MIN);
        if raw.similarity_score > *best {
            *best = raw.similarity_score;
        }
    }

    let mut set = CategoryCandidateSet::new();
    for (category, by_id) in grouped {
        let mut scored: Vec<(String, f32)> = by_id.into_iter().collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(max_per_category);

        let mut candidates = Vec::with_capacity(scored.len());
        for (item_id, score) in scored {
            let (price, source) = resolver.resolve(&item_id, &category)?;
            candidates.push(CandidateItem::new(
                item_id,
                category.clone(),
                score,
                price,
                source,
            )?);
        }
        set.insert(category, candidates);
    }

    if set.values().all(|candidates| candidates.is_empty()) {
        return Err(NormalizeError::EmptyCandidateSet);
    }

    Ok(set)
}
