//! Serialization of ranked combinations: CSV export and stdout report.

use std::path::Path;

use chrono::{SecondsFormat, Utc};

use crate::optimizer::RankedResult;
use crate::pricing::Price;

const CSV_HEADERS: [&str; 11] = [
    "query_number",
    "budget",
    "combination_rank",
    "total_price",
    "total_similarity",
    "remaining_budget",
    "category",
    "item_id",
    "similarity_score",
    "price",
    "price_source",
];

/// Write ranked combinations as CSV, one row per (combination, item),
/// with the query's budget carried on every row. All-skip combinations
/// produce a single row with empty item fields so their rank still
/// appears in the file.
pub fn write_combinations_csv(
    path: &Path,
    query_number: u64,
    budget: Price,
    results: &[RankedResult],
) -> anyhow::Result<()> {
    let temp_path = path.with_extension("csv-tmp");
    let mut csv_wrt = csv::Writer::from_path(&temp_path)?;
    csv_wrt.write_record(CSV_HEADERS)?;

    for result in results {
        let combination = &result.combination;
        let prefix = [
            query_number.to_string(),
            budget.to_decimal_string(),
            result.rank.to_string(),
            combination.total_price().to_decimal_string(),
            format!("{:.4}", combination.total_similarity()),
            combination.remaining_budget().to_decimal_string(),
        ];

        if combination.is_all_skip() {
            let mut row: Vec<String> = prefix.to_vec();
            row.extend(["", "", "", "", ""].map(String::from));
            csv_wrt.write_record(&row)?;
            continue;
        }

        for item in combination.items() {
            let mut row: Vec<String> = prefix.to_vec();
            row.push(item.category().to_string());
            row.push(item.item_id().to_string());
            row.push(format!("{:.4}", item.similarity_score()));
            row.push(item.price().to_decimal_string());
            row.push(item.source().as_str().to_string());
            csv_wrt.write_record(&row)?;
        }
    }

    csv_wrt.flush()?;
    std::fs::rename(&temp_path, path)?;
    log::info!("wrote {} ranked combinations to {}", results.len(), path.display());
    Ok(())
}

/// Print a human report of the top N combinations.
pub fn print_top(query_number: u64, budget: Price, results: &[RankedResult], top_n: usize) {
    let shown = top_n.min(results.len());
    println!(
        "Query {query_number} | budget {budget} | {} combinations within budget (showing {shown})",
        results.len()
    );
    println!(
        "generated at {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    );

    for result in results.iter().take(top_n) {
        let combination = &result.combination;
        println!();
        println!(
            "#{} total {} | similarity {:.4} | {} left",
            result.rank,
            combination.total_price(),
            combination.total_similarity(),
            combination.remaining_budget(),
        );

        if combination.is_all_skip() {
            println!("  (no items selected)");
            continue;
        }

        for item in combination.items() {
            let estimated = match item.source() {
                crate::pricing::PriceSource::Estimated => " (estimated)",
                crate::pricing::PriceSource::Catalog => "",
            };
            println!(
                "  {}: {} score {:.4} at {}{estimated}",
                item.category(),
                item.item_id(),
                item.similarity_score(),
                item.price(),
            );
        }
    }
}
