//! Budget-constrained combination optimizer.
//!
//! Enumerates the full cross-product of per-category candidate options,
//! discards combinations over budget and ranks the rest by total
//! similarity. The enumeration is deliberately brute force: category
//! counts and per-category candidate counts are small by design, and the
//! search-space guard refuses oversized inputs up front instead of
//! hanging mid-enumeration.
//!
//! Ordering is a strict total order so that re-running on identical
//! input yields byte-identical output:
//! 1. descending total similarity (`f32::total_cmp`, no epsilon);
//! 2. descending remaining budget (exact integer cents);
//! 3. ascending lexical order of chosen item ids.

use serde::Serialize;

use crate::candidates::{CandidateItem, CategoryCandidateSet};
use crate::pricing::Price;

/// Optimizer knobs. Budget comes in per call; these are policy.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizerConfig {
    /// Allow a combination to leave a category without a selection.
    /// The skip option contributes zero price and zero similarity.
    pub allow_skip_category: bool,
    /// Upper bound on the number of combinations to enumerate.
    pub max_search_space: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            allow_skip_category: false,
            max_search_space: 100_000,
        }
    }
}

/// One item (or none) chosen per category, evaluated against a budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Combination {
    items: Vec<CandidateItem>,
    total_price: Price,
    total_similarity: f32,
    remaining_budget: Price,
}

impl Combination {
    /// Chosen items in category order. Skipped categories are absent.
    pub fn items(&self) -> &[CandidateItem] {
        &self.items
    }

    pub fn total_price(&self) -> Price {
        self.total_price
    }

    pub fn total_similarity(&self) -> f32 {
        self.total_similarity
    }

    pub fn remaining_budget(&self) -> Price {
        self.remaining_budget
    }

    pub fn is_all_skip(&self) -> bool {
        self.items.is_empty()
    }

    fn item_ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(CandidateItem::item_id)
    }
}

/// A combination plus its 1-based rank among all admitted combinations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub rank: usize,
    pub combination: Combination,
}

#[derive(Debug, thiserror::Error)]
pub enum OptimizeError {
    #[error(
        "search space of {options} combinations across {categories} categories \
         exceeds the limit of {limit}; lower the per-category candidate count \
         or disable category skipping"
    )]
    SearchSpaceTooLarge {
        categories: usize,
        options: u64,
        limit: u64,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Enumerate, filter and rank all combinations for a candidate set.
///
/// Returns the full ranked sequence; callers truncate to top-N. An
/// empty result is a normal outcome meaning "infeasible under this
/// budget", not an error.
pub fn optimize(
    candidates: &CategoryCandidateSet,
    budget: Price,
    config: &OptimizerConfig,
) -> Result<Vec<RankedResult>, OptimizeError> {
    if candidates.is_empty() {
        return Err(OptimizeError::InvalidInput("empty candidate set".into()));
    }
    if config.max_search_space == 0 {
        return Err(OptimizeError::InvalidInput(
            "max search space must be positive".into(),
        ));
    }

    // BTreeMap iteration gives the fixed alphabetical category order.
    let options: Vec<Vec<Option<&CandidateItem>>> = candidates
        .values()
        .map(|list| {
            let mut opts: Vec<Option<&CandidateItem>> = list.iter().map(Some).collect();
            if config.allow_skip_category {
                opts.push(None);
            }
            opts
        })
        .collect();

    if options.iter().any(|opts| opts.is_empty()) {
        return Err(OptimizeError::InvalidInput(
            "category with no candidates".into(),
        ));
    }

    // Fail before enumerating, never truncate silently.
    let mut search_space: u64 = 1;
    for opts in &options {
        search_space = search_space
            .checked_mul(opts.len() as u64)
            .unwrap_or(u64::MAX);
    }
    if search_space > config.max_search_space {
        return Err(OptimizeError::SearchSpaceTooLarge {
            categories: options.len(),
            options: search_space,
            limit: config.max_search_space,
        });
    }

    log::debug!(
        "enumerating {search_space} combinations across {} categories",
        options.len()
    );

    let mut admitted: Vec<Combination> = Vec::new();
    let mut cursor = vec![0usize; options.len()];

    'enumerate: loop {
        evaluate(&options, &cursor, budget, &mut admitted);

        // odometer advance, most-significant slot first exhausts last
        let mut slot = options.len();
        loop {
            if slot == 0 {
                break 'enumerate;
            }
            slot -= 1;
            cursor[slot] += 1;
            if cursor[slot] < options[slot].len() {
                break;
            }
            cursor[slot] = 0;
        }
    }

    admitted.sort_by(|a, b| {
        b.total_similarity
            .total_cmp(&a.total_similarity)
            .then_with(|| b.remaining_budget.cmp(&a.remaining_budget))
            .then_with(|| a.item_ids().cmp(b.item_ids()))
    });

    Ok(admitted
        .into_iter()
        .enumerate()
        .map(|(idx, combination)| RankedResult {
            rank: idx + 1,
            combination,
        })
        .collect())
}

fn evaluate(
    options: &[Vec<Option<&CandidateItem>>],
    cursor: &[usize],
    budget: Price,
    admitted: &mut Vec<Combination>,
) {
    let mut total_price = Price::ZERO;
    let mut total_similarity = 0.0f32;
    let mut items = Vec::new();

    for (slot, &idx) in cursor.iter().enumerate() {
        let Some(item) = options[slot][idx] else {
            continue;
        };
        total_price = match total_price.checked_add(item.price()) {
            Some(sum) => sum,
            // overflow exceeds any representable budget
            None => return,
        };
        if total_price > budget {
            return;
        }
        total_similarity += item.similarity_score();
        items.push(item.clone());
    }

    admitted.push(Combination {
        items,
        total_price,
        total_similarity,
        remaining_budget: budget.saturating_sub(total_price),
    });
}
