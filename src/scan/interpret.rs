//! Turns untrusted model text into a validated dish.
//!
//! This is the only place raw model output is read. The text is located,
//! parsed with `serde_json`, classified (no food / dish / malformed) and every
//! numeric field is normalized before the aggregator derives totals. Nothing is
//! guessed: the object is cut out of surrounding fences or chatter, and
//! anything that then fails to parse is rejected as malformed.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::model::{AnalyzedDish, MalformedResponse};
use crate::nutrition::aggregator::{aggregate, RawIngredient};
use crate::nutrition::{non_negative, NutrientProfile};
use crate::vision::prompt::NO_FOOD_SENTINEL;

#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    NoFood,
    Dish(AnalyzedDish),
}

pub fn interpret(raw: &str) -> Result<Interpretation, MalformedResponse> {
    let candidate = locate_object(raw)
        .ok_or_else(|| MalformedResponse("no JSON object in response".into()))?;
    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| MalformedResponse(format!("invalid JSON: {}", e)))?;
    let Value::Object(obj) = value else {
        return Err(MalformedResponse("top-level value is not an object".into()));
    };

    if obj.get("message").and_then(Value::as_str) == Some(NO_FOOD_SENTINEL) {
        debug!("model reported no food");
        return Ok(Interpretation::NoFood);
    }

    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| MalformedResponse("missing dish name".into()))?
        .to_string();
    let description = obj
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    let entries = obj
        .get("ingredients")
        .and_then(Value::as_array)
        .ok_or_else(|| MalformedResponse("missing ingredients array".into()))?;

    let ingredients: Vec<RawIngredient> = entries
        .iter()
        .enumerate()
        .filter_map(|(idx, entry)| {
            let parsed = entry.as_object().and_then(parse_ingredient);
            if parsed.is_none() {
                warn!(index = idx, "dropping unusable ingredient entry");
            }
            parsed
        })
        .collect();
    if ingredients.is_empty() {
        return Err(MalformedResponse("no usable ingredients".into()));
    }

    Ok(Interpretation::Dish(AnalyzedDish {
        name,
        description,
        nutrients: aggregate(ingredients),
    }))
}

/// Span from the first `{` to the last `}`. Fences and prose on either side
/// fall outside it.
fn locate_object(raw: &str) -> Option<&str> {
    let text = raw.trim();
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_ingredient(obj: &Map<String, Value>) -> Option<RawIngredient> {
    let name = obj.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let per100g = obj
        .get("per100g")
        .and_then(Value::as_object)
        .map(parse_profile)
        .unwrap_or(NutrientProfile::ZERO);
    let weight = obj
        .get("estimatedWeight")
        .or_else(|| obj.get("estimatedWeightGrams"))
        .map(number)
        .unwrap_or(0.0);
    if weight == 0.0 {
        debug!(ingredient = name, "weight missing or unusable, totals will be zero");
    }
    Some(RawIngredient {
        name: name.to_string(),
        per100g,
        estimated_weight_grams: weight,
    })
}

fn parse_profile(obj: &Map<String, Value>) -> NutrientProfile {
    let field = |key: &str| obj.get(key).map(number).unwrap_or(0.0);
    NutrientProfile::new(
        field("calories"),
        field("proteins"),
        field("carbs"),
        field("fats"),
    )
}

/// JSON numbers or strings that are entirely a number; anything else is zero.
fn number(v: &Value) -> f64 {
    let n = match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    non_negative(n)
}
