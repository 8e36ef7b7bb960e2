//! Cross-module ordering guarantees: the ranked output must be a
//! strict total order that survives re-runs and bigger inputs.

use crate::candidates::{normalize, RawMatch};
use crate::catalog::{Catalog, CatalogItem};
use crate::optimizer::{optimize, OptimizerConfig};
use crate::pricing::{default_fallback_prices, Price, PriceResolver};

fn fallback_cents() -> std::collections::BTreeMap<String, Price> {
    default_fallback_prices()
        .into_iter()
        .map(|(category, dollars)| (category, Price::from_dollars(dollars).unwrap()))
        .collect()
}

fn raw(id: &str, category: &str, score: f32) -> RawMatch {
    RawMatch {
        item_id: id.to_string(),
        category: category.to_string(),
        similarity_score: score,
    }
}

fn priced_catalog(items: &[(&str, &str, u64)]) -> Catalog {
    let mut catalog = Catalog::empty();
    for (id, category, dollars) in items {
        catalog.insert(CatalogItem {
            item_id: id.to_string(),
            category: category.to_string(),
            name: id.to_string(),
            price: Some(format!("${dollars}")),
            color: None,
            image_url: None,
            link: None,
        });
    }
    catalog
}

#[test]
fn ranking_is_a_total_order_over_a_larger_input() {
    let catalog = priced_catalog(&[
        ("S1", "sofa", 900),
        ("S2", "sofa", 700),
        ("S3", "sofa", 500),
        ("C1", "chair", 400),
        ("C2", "chair", 250),
        ("T1", "table", 600),
        ("T2", "table", 300),
        ("L1", "lamp", 150),
        ("L2", "lamp", 100),
    ]);
    let fallback = fallback_cents();
    let resolver = PriceResolver::new(&catalog, &fallback);

    let matches = vec![
        raw("S1", "sofa", 0.95),
        raw("S2", "sofa", 0.90),
        raw("S3", "sofa", 0.70),
        raw("C1", "chair", 0.80),
        raw("C2", "chair", 0.60),
        raw("T1", "table", 0.85),
        raw("T2", "table", 0.65),
        raw("L1", "lamp", 0.55),
        raw("L2", "lamp", 0.45),
    ];

    let set = normalize(&matches, &resolver, 5).unwrap();
    let config = OptimizerConfig {
        allow_skip_category: true,
        ..Default::default()
    };
    let budget = Price::from_cents(180_000);

    let results = optimize(&set, budget, &config).unwrap();
    assert!(!results.is_empty());

    for (idx, result) in results.iter().enumerate() {
        assert_eq!(result.rank, idx + 1);
        assert!(result.combination.total_price() <= budget);
    }

    for pair in results.windows(2) {
        let (a, b) = (&pair[0].combination, &pair[1].combination);
        let sim_order = a.total_similarity() >= b.total_similarity();
        assert!(sim_order, "similarity must be non-increasing");
        if a.total_similarity() == b.total_similarity() {
            assert!(a.remaining_budget() >= b.remaining_budget());
            if a.remaining_budget() == b.remaining_budget() {
                let ids_a: Vec<&str> = a.items().iter().map(|i| i.item_id()).collect();
                let ids_b: Vec<&str> = b.items().iter().map(|i| i.item_id()).collect();
                assert!(ids_a < ids_b, "full ties must order by item ids");
            }
        }
    }

    // byte-identical on re-run
    let again = optimize(&set, budget, &config).unwrap();
    assert_eq!(results, again);
}

#[test]
fn normalize_then_optimize_is_idempotent_end_to_end() {
    let catalog = priced_catalog(&[("S1", "sofa", 500), ("T1", "table", 200)]);
    let fallback = fallback_cents();
    let resolver = PriceResolver::new(&catalog, &fallback);

    let matches = vec![raw("S1", "sofa", 0.9), raw("T1", "table", 0.7)];

    let set_a = normalize(&matches, &resolver, 5).unwrap();
    let set_b = normalize(&matches, &resolver, 5).unwrap();
    assert_eq!(set_a, set_b);

    let budget = Price::from_cents(100_000);
    let config = OptimizerConfig::default();
    assert_eq!(
        optimize(&set_a, budget, &config).unwrap(),
        optimize(&set_b, budget, &config).unwrap()
    );
}

#[test]
fn truncation_bounds_the_search_space() {
    let catalog = Catalog::empty();
    let fallback = fallback_cents();
    let resolver = PriceResolver::new(&catalog, &fallback);

    // 10 sofas recorded, K=2 retained
    let matches: Vec<RawMatch> = (0..10)
        .map(|i| raw(&format!("S{i}"), "sofa", 0.5 + i as f32 * 0.01))
        .collect();

    let set = normalize(&matches, &resolver, 2).unwrap();
    assert_eq!(set["sofa"].len(), 2);

    // highest-scoring two survive
    let ids: Vec<&str> = set["sofa"].iter().map(|c| c.item_id()).collect();
    assert_eq!(ids, vec!["S9", "S8"]);
}
