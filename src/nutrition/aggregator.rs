use tracing::{debug, warn};

use super::{non_negative, Ingredient, NutrientProfile};

/// Weights above this are kept as-is but logged; no upper bound is enforced.
const SUSPICIOUS_WEIGHT_GRAMS: f64 = 5_000.0;

/// Ingredient as validated by the interpreter, before totals are derived.
#[derive(Debug, Clone, PartialEq)]
pub struct RawIngredient {
    pub name: String,
    pub per100g: NutrientProfile,
    pub estimated_weight_grams: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub ingredients: Vec<Ingredient>,
    pub total: NutrientProfile,
}

/// Recomputes every ingredient's totals from its per-100g profile and weight and
/// sums them into the dish total.
pub fn aggregate(raw: Vec<RawIngredient>) -> Aggregate {
    let ingredients: Vec<Ingredient> = raw.into_iter().map(derive_ingredient).collect();
    let total: NutrientProfile = ingredients.iter().map(|i| &i.total_values).sum();
    debug!(count = ingredients.len(), "ingredients aggregated");
    Aggregate { ingredients, total }
}

fn derive_ingredient(raw: RawIngredient) -> Ingredient {
    let weight = non_negative(raw.estimated_weight_grams);
    if weight > SUSPICIOUS_WEIGHT_GRAMS {
        warn!(ingredient = %raw.name, weight, "unusually large weight estimate");
    }
    Ingredient {
        total_values: raw.per100g.scale(weight / 100.0),
        name: raw.name,
        per100g: raw.per100g,
        estimated_weight_grams: weight,
    }
}
