//! Master query log and per-query similarity results.
//!
//! The upstream pipeline records every design request in
//! `master_query_log.csv` and drops each request's vector-search output
//! in `query_<n>/similarity_results.csv`. This module reads both,
//! aggregates a query's matches into a normalized candidate set and
//! writes the selection status back once combinations are exported.

use std::path::{Path, PathBuf};

use anyhow::anyhow;

use crate::candidates::{self, CategoryCandidateSet, NormalizeError, RawMatch};
use crate::pricing::{parse_budget, Price, PriceResolver, PricingError};

const MASTER_LOG: &str = "master_query_log.csv";
const SIMILARITY_RESULTS: &str = "similarity_results.csv";

const MASTER_LOG_HEADERS: [&str; 7] = [
    "request_number",
    "room_type",
    "style_type",
    "color_palette",
    "budget",
    "similarity_done",
    "selection_done",
];

const SIMILARITY_HEADERS: [&str; 5] = [
    "query_number",
    "category",
    "rank",
    "item_id",
    "similarity_score",
];

/// One design request recorded in the master log.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct QueryRun {
    pub request_number: u64,
    pub room_type: String,
    pub style_type: String,
    pub color_palette: String,
    /// Raw budget string as recorded, e.g. `"$1,500"`.
    pub budget: String,
    pub similarity_done: bool,
    pub selection_done: bool,
}

impl QueryRun {
    pub fn budget(&self) -> Result<Price, PricingError> {
        parse_budget(&self.budget)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("no similarity results recorded for query {0}")]
    MissingQueryData(u64),

    #[error("query {0} not found in the master log")]
    UnknownQuery(u64),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed log entry: {0}")]
    Malformed(#[from] anyhow::Error),
}

/// Read-through view over the queries directory.
pub struct QueryLog {
    base_dir: PathBuf,
    entries: Vec<QueryRun>,
}

impl QueryLog {
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, AggregateError> {
        let base_dir = base_dir.into();
        let log_path = base_dir.join(MASTER_LOG);

        let mut csv_reader = csv::Reader::from_path(&log_path)?;
        let mut entries = vec![];
        for record in csv_reader.records() {
            let record = record?;
            let request_number = record
                .get(0)
                .ok_or(anyhow!("couldnt get request_number"))?
                .parse::<u64>()
                .map_err(|e| anyhow!("bad request_number: {e}"))?;
            let room_type = record
                .get(1)
                .ok_or(anyhow!("couldnt get room_type"))?
                .to_string();
            let style_type = record
                .get(2)
                .ok_or(anyhow!("couldnt get style_type"))?
                .to_string();
            let color_palette = record
                .get(3)
                .ok_or(anyhow!("couldnt get color_palette"))?
                .to_string();
            let budget = record
                .get(4)
                .ok_or(anyhow!("couldnt get budget"))?
                .to_string();
            let similarity_done = parse_status(
                record.get(5).ok_or(anyhow!("couldnt get similarity_done"))?,
            )?;
            let selection_done = parse_status(
                record.get(6).ok_or(anyhow!("couldnt get selection_done"))?,
            )?;

            entries.push(QueryRun {
                request_number,
                room_type,
                style_type,
                color_palette,
                budget,
                similarity_done,
                selection_done,
            });
        }

        log::debug!("loaded {} query log entries", entries.len());
        Ok(QueryLog { base_dir, entries })
    }

    pub fn entries(&self) -> &[QueryRun] {
        &self.entries
    }

    pub fn get(&self, query_number: u64) -> Option<&QueryRun> {
        self.entries
            .iter()
            .find(|run| run.request_number == query_number)
    }

    /// Latest entry whose similarity search ran but whose combination
    /// selection hasn't (the next query in the pipeline's queue).
    pub fn latest_pending_selection(&self) -> Option<&QueryRun> {
        self.entries
            .iter()
            .rev()
            .find(|run| run.similarity_done && !run.selection_done)
    }

    pub fn query_dir(&self, query_number: u64) -> PathBuf {
        self.base_dir.join(format!("query_{query_number}"))
    }

    /// Load the raw similarity matches recorded for a query.
    pub fn raw_matches(&self, query_number: u64) -> Result<Vec<RawMatch>, AggregateError> {
        let path = self.query_dir(query_number).join(SIMILARITY_RESULTS);
        if !path.exists() {
            return Err(AggregateError::MissingQueryData(query_number));
        }

        let mut csv_reader = csv::Reader::from_path(&path)?;
        let mut matches = vec![];
        for record in csv_reader.records() {
            let record = record?;
            let category = record
                .get(1)
                .ok_or(anyhow!("couldnt get category"))?
                .to_string();
            let item_id = record
                .get(3)
                .ok_or(anyhow!("couldnt get item_id"))?
                .to_string();
            let similarity_score = record
                .get(4)
                .ok_or(anyhow!("couldnt get similarity_score"))?
                .parse::<f32>()
                .map_err(|e| anyhow!("bad similarity_score: {e}"))?;

            matches.push(RawMatch {
                item_id,
                category,
                similarity_score,
            });
        }

        if matches.is_empty() {
            return Err(AggregateError::MissingQueryData(query_number));
        }

        Ok(matches)
    }

    /// Aggregate a query's recorded matches into a normalized,
    /// price-resolved candidate set.
    pub fn aggregate(
        &self,
        query_number: u64,
        resolver: &PriceResolver,
        max_per_category: usize,
    ) -> Result<CategoryCandidateSet, AggregateError> {
        let matches = self.raw_matches(query_number)?;
        let set = candidates::normalize(&matches, resolver, max_per_category)?;
        log::info!(
            "query {query_number}: {} categories, {} candidates",
            set.len(),
            set.values().map(Vec::len).sum::<usize>()
        );
        Ok(set)
    }

    /// Flip `selection_done` for a query and rewrite the master log.
    pub fn mark_selection_done(&mut self, query_number: u64) -> Result<(), AggregateError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|run| run.request_number == query_number)
            .ok_or(AggregateError::UnknownQuery(query_number))?;
        entry.selection_done = true;
        self.save()
    }

    fn save(&self) -> Result<(), AggregateError> {
        let path = self.base_dir.join(MASTER_LOG);
        let temp_path = self.base_dir.join(format!("{MASTER_LOG}-tmp"));

        let mut csv_wrt = csv::Writer::from_path(&temp_path)?;
        csv_wrt.write_record(MASTER_LOG_HEADERS)?;
        for run in &self.entries {
            csv_wrt.write_record([
                run.request_number.to_string().as_str(),
                run.room_type.as_str(),
                run.style_type.as_str(),
                run.color_palette.as_str(),
                run.budget.as_str(),
                status_str(run.similarity_done),
                status_str(run.selection_done),
            ])?;
        }
        csv_wrt.flush()?;
        std::fs::rename(&temp_path, &path)?;
        Ok(())
    }
}

/// Write a similarity-results file the way the search pipeline does.
/// Used by tooling and tests to seed query directories.
pub fn write_similarity_results(
    query_dir: &Path,
    query_number: u64,
    matches: &[RawMatch],
) -> Result<(), AggregateError> {
    std::fs::create_dir_all(query_dir)?;
    let path = query_dir.join(SIMILARITY_RESULTS);

    let mut csv_wrt = csv::Writer::from_path(&path)?;
    csv_wrt.write_record(SIMILARITY_HEADERS)?;
    for (idx, m) in matches.iter().enumerate() {
        csv_wrt.write_record([
            query_number.to_string().as_str(),
            m.category.as_str(),
            (idx + 1).to_string().as_str(),
            m.item_id.as_str(),
            m.similarity_score.to_string().as_str(),
        ])?;
    }
    csv_wrt.flush()?;
    Ok(())
}

fn parse_status(raw: &str) -> Result<bool, AggregateError> {
    match raw.trim().to_lowercase().as_str() {
        "yes" | "true" | "1" => Ok(true),
        "no" | "false" | "0" | "" => Ok(false),
        other => Err(AggregateError::Malformed(anyhow!(
            "unrecognized status '{other}'"
        ))),
    }
}

fn status_str(done: bool) -> &'static str {
    if done {
        "yes"
    } else {
        "no"
    }
}
