use anyhow::{anyhow, bail};
use clap::Parser;

mod candidates;
mod catalog;
mod cli;
mod config;
mod export;
mod index;
mod optimizer;
mod pricing;
mod querylog;
#[cfg(test)]
mod tests;

use catalog::Catalog;
use config::Config;
use optimizer::OptimizerConfig;
use pricing::{parse_budget, PriceResolver};
use querylog::QueryLog;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();
    let config = Config::load_with(&args.dir);

    match args.command {
        cli::Command::Queries { pending } => {
            let qlog = QueryLog::open(config.queries_dir())?;
            for run in qlog.entries() {
                if pending && (run.selection_done || !run.similarity_done) {
                    continue;
                }
                let status = if run.selection_done {
                    "done"
                } else if run.similarity_done {
                    "pending selection"
                } else {
                    "awaiting similarity search"
                };
                println!(
                    "#{} {} / {} / {} budget {} [{status}]",
                    run.request_number, run.room_type, run.style_type, run.color_palette, run.budget,
                );
            }
            Ok(())
        }

        cli::Command::Optimize {
            query,
            budget,
            top,
            allow_skip,
            max_candidates,
            json,
            no_mark_done,
        } => {
            let catalog = load_catalog(&config);
            let mut qlog = QueryLog::open(config.queries_dir())?;

            let run = match query {
                Some(n) => qlog
                    .get(n)
                    .ok_or_else(|| anyhow!("query {n} not found in the master log"))?,
                None => qlog
                    .latest_pending_selection()
                    .ok_or_else(|| anyhow!("no queries pending combination selection"))?,
            }
            .clone();
            let query_number = run.request_number;

            let budget = match budget {
                Some(raw) => parse_budget(&raw)?,
                None => run.budget()?,
            };

            let fallback = config.fallback_table();
            let resolver = PriceResolver::new(&catalog, &fallback);
            let k = max_candidates.unwrap_or(config.optimizer.max_candidates_per_category);
            let candidate_set = qlog.aggregate(query_number, &resolver, k)?;

            let optimizer_config = OptimizerConfig {
                allow_skip_category: allow_skip || config.optimizer.allow_skip_category,
                max_search_space: config.optimizer.max_search_space,
            };
            let results = optimizer::optimize(&candidate_set, budget, &optimizer_config)?;

            if results.is_empty() {
                println!(
                    "no combinations fit within {budget} for query {query_number}; \
                     the query stays pending"
                );
                return Ok(());
            }

            let out_path = qlog.query_dir(query_number).join("furniture_combinations.csv");
            export::write_combinations_csv(&out_path, query_number, budget, &results)?;

            if json {
                let shown: Vec<_> = results.iter().take(top).collect();
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                export::print_top(query_number, budget, &results, top);
            }

            if !no_mark_done {
                qlog.mark_selection_done(query_number)?;
                log::info!("marked query {query_number} selection-done");
            }

            Ok(())
        }

        cli::Command::CatalogStats {} => {
            let path = config.catalog_path();
            let Some(path_str) = path.to_str() else {
                bail!("catalog path is not valid utf8");
            };
            let catalog = Catalog::load(path_str)?;

            println!("{} items in {}", catalog.len(), path.display());
            for (category, (priced, total)) in catalog.price_coverage() {
                println!("  {category}: {total} items, {priced} with usable prices");
            }
            Ok(())
        }
    }
}

/// The catalog is optional: on a miss every candidate simply resolves
/// to its category's fallback estimate, matching how the pipeline
/// behaves before a catalog scrape has run.
fn load_catalog(config: &Config) -> Catalog {
    let path = config.catalog_path();
    match path.to_str() {
        Some(path_str) if path.exists() => match Catalog::load(path_str) {
            Ok(catalog) => catalog,
            Err(err) => {
                log::warn!("failed to load catalog at {}: {err}", path.display());
                Catalog::empty()
            }
        },
        _ => {
            log::warn!(
                "catalog not found at {}, using estimated prices only",
                path.display()
            );
            Catalog::empty()
        }
    }
}
