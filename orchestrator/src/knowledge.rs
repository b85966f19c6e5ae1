// orchestrator/src/knowledge.rs

use krishi_core::KnowledgeEntry;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Built-in mandi rates in INR per quintal, in lookup order. Aliases repeat
/// the price of the crop they name.
const MARKET_RATES: [(&str, u32); 11] = [
    ("onion", 2400),
    ("pyaz", 2400),
    ("kanda", 2400),
    ("tomato", 1800),
    ("tamatar", 1800),
    ("potato", 1200),
    ("aloo", 1200),
    ("wheat", 2200),
    ("gehu", 2200),
    ("rice", 3000),
    ("chawal", 3000),
];

const PRICE_UNIT: &str = "INR/Quintal";

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("failed to read price table {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("price table is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("price table entry '{0}' must be a number or a string")]
    BadPrice(String),
    #[error("price table must be a JSON array of entries or an object of keyword to price")]
    BadShape,
}

/// Lower-cases and trims user text before it is matched against keywords.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Read-only price table. Order matters: the first matching keyword wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBase {
    entries: Vec<KnowledgeEntry>,
}

impl KnowledgeBase {
    pub fn new(entries: Vec<KnowledgeEntry>) -> Self {
        Self { entries }
    }

    /// The default table of the Krishi Sahayak deployment.
    pub fn market_rates() -> Self {
        Self::new(
            MARKET_RATES
                .iter()
                .map(|(keyword, price)| KnowledgeEntry::new(keyword, format_price(*price)))
                .collect(),
        )
    }

    /// Accepts either `[{"keyword": .., "displayPrice": ..}, ..]` or an object
    /// `{"onion": 2400, "pyaz": "2400 INR/Quintal", ..}` whose key order is kept.
    /// Bare numbers are read as INR per quintal.
    pub fn from_json_str(json: &str) -> Result<Self, KnowledgeError> {
        match serde_json::from_str::<Value>(json)? {
            Value::Array(_) => {
                let entries: Vec<KnowledgeEntry> = serde_json::from_str(json)?;
                Ok(Self::new(
                    entries
                        .into_iter()
                        .map(|e| KnowledgeEntry::new(&e.keyword, e.display_price))
                        .collect(),
                ))
            }
            Value::Object(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (keyword, price) in map {
                    let display_price = match price {
                        Value::Number(n) => format!("{} {}", n, PRICE_UNIT),
                        Value::String(s) => s,
                        _ => return Err(KnowledgeError::BadPrice(keyword)),
                    };
                    entries.push(KnowledgeEntry::new(&keyword, display_price));
                }
                Ok(Self::new(entries))
            }
            _ => Err(KnowledgeError::BadShape),
        }
    }

    pub fn load(path: &Path) -> Result<Self, KnowledgeError> {
        let json = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let knowledge = Self::from_json_str(&json)?;
        info!(
            "[Knowledge] Loaded {} price entries from {}",
            knowledge.len(),
            path.display()
        );
        Ok(knowledge)
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose keyword occurs anywhere in `normalized_text`.
    ///
    /// Plain substring containment: "riceberry" and "price" both match "rice".
    pub fn lookup(&self, normalized_text: &str) -> Option<&KnowledgeEntry> {
        self.entries
            .iter()
            .find(|entry| !entry.keyword.is_empty() && normalized_text.contains(&entry.keyword))
    }

    /// The table as an ordered JSON object, for embedding in a prompt.
    pub fn to_prompt_json(&self) -> String {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|e| (e.keyword.clone(), Value::String(e.display_price.clone())))
            .collect();
        Value::Object(map).to_string()
    }
}

fn format_price(rupees_per_quintal: u32) -> String {
    format!("{} {}", rupees_per_quintal, PRICE_UNIT)
}
