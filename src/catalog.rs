//! Read-only view over the scraped master furniture catalog.
//!
//! The catalog is a CSV compiled by the scraping pipeline. It is loaded
//! once per run into an immutable in-memory snapshot; callers that need
//! it from several threads wrap it in an `Arc`.

use std::collections::{BTreeMap, HashMap};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// One master-catalog row as scraped. The price is kept as the raw
/// string; parsing happens in the price-resolution policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub item_id: String,
    pub category: String,
    pub name: String,
    pub price: Option<String>,
    pub color: Option<String>,
    pub image_url: Option<String>,
    pub link: Option<String>,
}

const CSV_HEADERS: [&str; 7] = [
    "catalog_number",
    "item_type",
    "item_name",
    "price",
    "color",
    "image_url",
    "link",
];

/// Immutable snapshot of the master catalog, keyed by
/// (lowercased category, item id).
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: HashMap<(String, String), CatalogItem>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let mut csv_reader = csv::Reader::from_path(path)?;

        let mut catalog = Catalog::empty();
        for record in csv_reader.records() {
            let record = record?;
            let item_id = record
                .get(0)
                .ok_or(anyhow!("couldnt get catalog_number"))?
                .trim()
                .to_string();
            let category = record
                .get(1)
                .ok_or(anyhow!("couldnt get item_type"))?
                .trim()
                .to_string();
            let name = record
                .get(2)
                .ok_or(anyhow!("couldnt get item_name"))?
                .to_string();
            let price = record.get(3).map(str::to_string).filter(|s| !s.is_empty());
            let color = record.get(4).map(str::to_string).filter(|s| !s.is_empty());
            let image_url = record.get(5).map(str::to_string).filter(|s| !s.is_empty());
            let link = record.get(6).map(str::to_string).filter(|s| !s.is_empty());

            if item_id.is_empty() || category.is_empty() {
                log::warn!("skipping catalog row with empty id or category");
                continue;
            }

            catalog.insert(CatalogItem {
                item_id,
                category,
                name,
                price,
                color,
                image_url,
                link,
            });
        }

        log::info!("loaded {} catalog items from {path}", catalog.len());
        Ok(catalog)
    }

    /// Insert a row. Duplicate (category, item_id) pairs keep the last
    /// row seen, matching how the scrapers re-emit updated listings.
    pub fn insert(&mut self, item: CatalogItem) {
        let key = (item.category.to_lowercase(), item.item_id.clone());
        if self.items.insert(key, item).is_some() {
            log::warn!("duplicate catalog row, keeping the newer one");
        }
    }

    pub fn get(&self, item_id: &str, category: &str) -> Option<&CatalogItem> {
        self.items
            .get(&(category.to_lowercase(), item_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Per-category (priced, total) row counts, used by `catalog-stats`.
    pub fn price_coverage(&self) -> BTreeMap<String, (usize, usize)> {
        let mut coverage: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for ((category, _), item) in &self.items {
            let entry = coverage.entry(category.clone()).or_default();
            entry.1 += 1;
            if item
                .price
                .as_deref()
                .and_then(crate::pricing::Price::parse)
                .is_some()
            {
                entry.0 += 1;
            }
        }
        coverage
    }

    /// Serialize the catalog back to CSV. Only used by tests and
    /// tooling; the catalog is read-only during optimization runs.
    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let temp_path = format!("{path}-tmp");
        let mut csv_wrt = csv::Writer::from_path(&temp_path)?;
        csv_wrt.write_record(CSV_HEADERS)?;

        // stable order for reproducible files
        let mut keys: Vec<_> = self.items.keys().collect();
        keys.sort();
        for key in keys {
            let item = &self.items[key];
            csv_wrt.write_record([
                item.item_id.as_str(),
                item.category.as_str(),
                item.name.as_str(),
                item.price.as_deref().unwrap_or_default(),
                item.color.as_deref().unwrap_or_default(),
                item.image_url.as_deref().unwrap_or_default(),
                item.link.as_deref().unwrap_or_default(),
            ])?;
        }
        csv_wrt.flush()?;
        std::fs::rename(&temp_path, path)?;
        Ok(())
    }
}
