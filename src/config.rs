use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::pricing::{default_fallback_prices, Price};

const DEFAULT_MAX_CANDIDATES: usize = 5;
const DEFAULT_MAX_SEARCH_SPACE: u64 = 100_000;
const DEFAULT_CATALOG_PATH: &str = "catalog/master_catalog.csv";
const DEFAULT_QUERIES_DIR: &str = "queries";

/// Optimizer policy knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptimizerSettings {
    /// Top-K candidates retained per category before enumeration.
    #[serde(default = "default_max_candidates")]
    pub max_candidates_per_category: usize,

    /// Upper bound on enumerated combinations; oversized inputs fail
    /// fast instead of hanging.
    #[serde(default = "default_max_search_space")]
    pub max_search_space: u64,

    /// Allow combinations that leave a category unfilled.
    #[serde(default)]
    pub allow_skip_category: bool,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_candidates_per_category: DEFAULT_MAX_CANDIDATES,
            max_search_space: DEFAULT_MAX_SEARCH_SPACE,
            allow_skip_category: false,
        }
    }
}

fn default_max_candidates() -> usize {
    DEFAULT_MAX_CANDIDATES
}

fn default_max_search_space() -> u64 {
    DEFAULT_MAX_SEARCH_SPACE
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub optimizer: OptimizerSettings,

    /// category -> fallback estimate in whole dollars, used when a
    /// candidate has no usable catalog price
    #[serde(default = "default_fallback_prices")]
    pub fallback_prices: BTreeMap<String, f64>,

    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    #[serde(default = "default_queries_dir")]
    pub queries_dir: String,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            optimizer: OptimizerSettings::default(),
            fallback_prices: default_fallback_prices(),
            catalog_path: DEFAULT_CATALOG_PATH.to_string(),
            queries_dir: DEFAULT_QUERIES_DIR.to_string(),
            base_path: String::new(),
        }
    }
}

fn default_catalog_path() -> String {
    DEFAULT_CATALOG_PATH.to_string()
}

fn default_queries_dir() -> String {
    DEFAULT_QUERIES_DIR.to_string()
}

impl Config {
    fn validate(&self) {
        if self.optimizer.max_candidates_per_category == 0 {
            panic!("optimizer.max_candidates_per_category must be greater than 0");
        }
        if self.optimizer.max_search_space == 0 {
            panic!("optimizer.max_search_space must be greater than 0");
        }
        for (category, dollars) in &self.fallback_prices {
            if !dollars.is_finite() || *dollars <= 0.0 {
                panic!("fallback price for '{category}' must be a positive number, got {dollars}");
            }
        }
    }

    pub fn load_with(base_path: &str) -> Self {
        let config_path = Path::new(base_path).join("config.yaml");

        // create new if does not exist
        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent).expect("couldnt create config directory");
            }
            std::fs::write(
                &config_path,
                serde_yml::to_string(&Self::default()).unwrap().as_bytes(),
            )
            .expect("couldnt write default config");
        }

        let config_str =
            std::fs::read_to_string(&config_path).expect("config file is not valid utf8");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_string();
        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).unwrap() {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let config_path = Path::new(&self.base_path).join("config.yaml");
        let config_str = serde_yml::to_string(&self).unwrap();
        std::fs::write(config_path, config_str.as_bytes()).expect("couldnt save config");
    }

    pub fn catalog_path(&self) -> PathBuf {
        Path::new(&self.base_path).join(&self.catalog_path)
    }

    pub fn queries_dir(&self) -> PathBuf {
        Path::new(&self.base_path).join(&self.queries_dir)
    }

    /// Fallback table in cents, keyed by lowercased category.
    pub fn fallback_table(&self) -> BTreeMap<String, Price> {
        self.fallback_prices
            .iter()
            .filter_map(|(category, dollars)| {
                Price::from_dollars(*dollars).map(|price| (category.to_lowercase(), price))
            })
            .collect()
    }
}
