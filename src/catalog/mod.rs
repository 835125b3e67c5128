//! Static per-100g food catalog used when the user searches manually instead
//! of scanning a photo.

pub mod handlers;

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::nutrition::NutrientProfile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    pub per100g: NutrientProfile,
}

#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    items: Vec<FoodItem>,
}

impl StaticCatalog {
    pub fn new(mut items: Vec<FoodItem>) -> Self {
        items.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Self { items }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        let items: Vec<FoodItem> = serde_json::from_str(&raw).context("parse catalog json")?;
        let catalog = Self::new(items);
        if catalog.is_empty() {
            tracing::warn!(path = %path.display(), "food catalog is empty");
        } else {
            tracing::info!(items = catalog.len(), "food catalog loaded");
        }
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&FoodItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Case-insensitive name substring match with optional exact
    /// category/subcategory filters. Results are sorted by name.
    pub fn search(
        &self,
        query: &str,
        category: Option<&str>,
        subcategory: Option<&str>,
    ) -> Vec<&FoodItem> {
        let needle = query.trim().to_lowercase();
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        let subcategory = subcategory.map(str::trim).filter(|c| !c.is_empty());
        if needle.is_empty() && category.is_none() && subcategory.is_none() {
            return Vec::new();
        }
        self.items
            .iter()
            .filter(|i| needle.is_empty() || i.name.to_lowercase().contains(&needle))
            .filter(|i| category.map_or(true, |c| i.category.eq_ignore_ascii_case(c)))
            .filter(|i| {
                subcategory.map_or(true, |s| {
                    i.subcategory
                        .as_deref()
                        .is_some_and(|own| own.eq_ignore_ascii_case(s))
                })
            })
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn sample() -> Self {
        let item = |id: &str, name: &str, cat: &str, sub: Option<&str>, p: [f64; 4]| FoodItem {
            id: id.into(),
            name: name.into(),
            category: cat.into(),
            subcategory: sub.map(str::to_string),
            per100g: NutrientProfile::new(p[0], p[1], p[2], p[3]),
        };
        Self::new(vec![
            item("rice-white", "White rice", "grains", Some("rice"), [130.0, 2.7, 28.0, 0.3]),
            item("rice-brown", "Brown rice", "grains", Some("rice"), [123.0, 2.7, 25.6, 1.0]),
            item("oats", "Oats", "grains", Some("cereal"), [389.0, 16.9, 66.3, 6.9]),
            item("apple", "Apple", "fruit", None, [52.0, 0.3, 13.8, 0.2]),
            item("chicken-breast", "Chicken breast", "meat", Some("poultry"), [165.0, 31.0, 0.0, 3.6]),
        ])
    }
}
