//! End-to-end pipeline tests over on-disk fixtures: catalog CSV +
//! master query log + similarity results -> ranked combinations CSV.

use std::path::Path;

use crate::candidates::RawMatch;
use crate::catalog::{Catalog, CatalogItem};
use crate::export;
use crate::index::{InMemoryIndex, SimilarityIndex};
use crate::optimizer::{optimize, OptimizerConfig};
use crate::pricing::{default_fallback_prices, Price, PriceResolver, PriceSource};
use crate::querylog::{write_similarity_results, QueryLog};

const MASTER_LOG_HEADERS: [&str; 7] = [
    "request_number",
    "room_type",
    "style_type",
    "color_palette",
    "budget",
    "similarity_done",
    "selection_done",
];

fn seed_master_log(dir: &Path, rows: &[(u64, &str)]) {
    std::fs::create_dir_all(dir).unwrap();
    let mut csv_wrt = csv::Writer::from_path(dir.join("master_query_log.csv")).unwrap();
    csv_wrt.write_record(MASTER_LOG_HEADERS).unwrap();
    for &(n, budget) in rows {
        csv_wrt
            .write_record([
                n.to_string().as_str(),
                "living room",
                "mid-century",
                "walnut",
                budget,
                "yes",
                "no",
            ])
            .unwrap();
    }
    csv_wrt.flush().unwrap();
}

fn seed_catalog(path: &Path, items: &[(&str, &str, Option<&str>)]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut catalog = Catalog::empty();
    for (id, category, price) in items {
        catalog.insert(CatalogItem {
            item_id: id.to_string(),
            category: category.to_string(),
            name: format!("{category} {id}"),
            price: price.map(str::to_string),
            color: None,
            image_url: None,
            link: None,
        });
    }
    catalog.save(path.to_str().unwrap()).unwrap();
}

fn fallback_cents() -> std::collections::BTreeMap<String, Price> {
    default_fallback_prices()
        .into_iter()
        .map(|(category, dollars)| (category, Price::from_dollars(dollars).unwrap()))
        .collect()
}

#[test]
fn full_run_from_files_to_ranked_csv() {
    let tmp = tempfile::tempdir().unwrap();
    let queries = tmp.path().join("queries");
    let catalog_path = tmp.path().join("catalog").join("master_catalog.csv");

    seed_master_log(&queries, &[(3, "$600")]);
    seed_catalog(
        &catalog_path,
        &[
            ("S1", "sofa", Some("$500")),
            ("S2", "sofa", Some("$300")),
            ("T1", "table", Some("$200")),
        ],
    );

    let mut qlog = QueryLog::open(&queries).unwrap();
    let run = qlog.latest_pending_selection().unwrap().clone();
    assert_eq!(run.request_number, 3);

    write_similarity_results(
        &qlog.query_dir(3),
        3,
        &[
            RawMatch {
                item_id: "S1".into(),
                category: "sofa".into(),
                similarity_score: 0.9,
            },
            RawMatch {
                item_id: "S2".into(),
                category: "sofa".into(),
                similarity_score: 0.8,
            },
            RawMatch {
                item_id: "T1".into(),
                category: "table".into(),
                similarity_score: 0.7,
            },
        ],
    )
    .unwrap();

    let catalog = Catalog::load(catalog_path.to_str().unwrap()).unwrap();
    let fallback = fallback_cents();
    let resolver = PriceResolver::new(&catalog, &fallback);

    let candidate_set = qlog.aggregate(3, &resolver, 5).unwrap();
    let budget = run.budget().unwrap();
    let results = optimize(&candidate_set, budget, &OptimizerConfig::default()).unwrap();

    // only (S2, T1) fits the $600 budget
    assert_eq!(results.len(), 1);
    let ids: Vec<&str> = results[0]
        .combination
        .items()
        .iter()
        .map(|i| i.item_id())
        .collect();
    assert_eq!(ids, vec!["S2", "T1"]);
    assert_eq!(results[0].combination.total_price(), Price::from_cents(50_000));

    let out_path = qlog.query_dir(3).join("furniture_combinations.csv");
    export::write_combinations_csv(&out_path, 3, budget, &results).unwrap();
    let contents = std::fs::read_to_string(&out_path).unwrap();
    assert!(contents.contains("S2"));
    assert!(contents.contains("T1"));
    assert!(!contents.contains("S1,"));
    // the budget rides along on every data row
    assert!(contents.lines().skip(1).all(|l| l.contains(",600.00,")));

    qlog.mark_selection_done(3).unwrap();
    let reloaded = QueryLog::open(&queries).unwrap();
    assert!(reloaded.get(3).unwrap().selection_done);
}

#[test]
fn catalog_miss_flows_through_as_estimated() {
    let tmp = tempfile::tempdir().unwrap();
    let queries = tmp.path().join("queries");
    seed_master_log(&queries, &[(1, "$5,000")]);

    let qlog = QueryLog::open(&queries).unwrap();
    write_similarity_results(
        &qlog.query_dir(1),
        1,
        &[
            RawMatch {
                item_id: "X9".into(),
                category: "sofa".into(),
                similarity_score: 0.85,
            },
            RawMatch {
                item_id: "T1".into(),
                category: "table".into(),
                similarity_score: 0.75,
            },
        ],
    )
    .unwrap();

    // empty catalog: everything resolves to fallback estimates
    let catalog = Catalog::empty();
    let fallback = fallback_cents();
    let resolver = PriceResolver::new(&catalog, &fallback);

    let candidate_set = qlog.aggregate(1, &resolver, 5).unwrap();
    let results = optimize(
        &candidate_set,
        Price::from_cents(500_000),
        &OptimizerConfig::default(),
    )
    .unwrap();

    assert!(!results.is_empty());
    for result in &results {
        for item in result.combination.items() {
            if item.item_id() == "X9" {
                assert_eq!(item.source(), PriceSource::Estimated);
                assert_eq!(item.price(), Price::from_dollars(1650.0).unwrap());
            }
        }
    }
}

#[test]
fn index_search_feeds_the_aggregation_pipeline() {
    let tmp = tempfile::tempdir().unwrap();
    let queries = tmp.path().join("queries");
    seed_master_log(&queries, &[(2, "$4,000")]);

    // index holds catalog-item embeddings; the query vector stands in
    // for an embedded room rendering
    let mut index = InMemoryIndex::new(4);
    index.insert("S1", "sofa", vec![1.0, 0.0, 0.0, 0.0]).unwrap();
    index.insert("S2", "sofa", vec![0.9, 0.4, 0.0, 0.0]).unwrap();
    index.insert("T1", "table", vec![0.0, 0.0, 1.0, 0.0]).unwrap();
    index.insert("C1", "chair", vec![0.0, 1.0, 0.0, 0.0]).unwrap();

    let mut matches = index
        .search(&[1.0, 0.1, 0.0, 0.0], Some("sofa"), 3)
        .unwrap();
    matches.extend(index.search(&[0.0, 0.0, 1.0, 0.1], Some("table"), 3).unwrap());

    let qlog = QueryLog::open(&queries).unwrap();
    write_similarity_results(&qlog.query_dir(2), 2, &matches).unwrap();

    let catalog = Catalog::empty();
    let fallback = fallback_cents();
    let resolver = PriceResolver::new(&catalog, &fallback);

    let candidate_set = qlog.aggregate(2, &resolver, 5).unwrap();
    assert_eq!(candidate_set.len(), 2);
    assert!(candidate_set.contains_key("sofa"));
    assert!(candidate_set.contains_key("table"));

    // chair never matched the sofa/table filters
    assert!(candidate_set
        .values()
        .flatten()
        .all(|c| c.item_id() != "C1"));

    let results = optimize(
        &candidate_set,
        Price::from_cents(400_000),
        &OptimizerConfig::default(),
    )
    .unwrap();
    assert!(!results.is_empty());
    // best sofa + best table leads the ranking
    assert_eq!(results[0].combination.items().len(), 2);
}
