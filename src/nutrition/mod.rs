pub mod aggregator;

use std::iter::Sum;
use std::ops::Add;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Macro nutrients for some amount of food. Values are always finite and non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawProfile")]
pub struct NutrientProfile {
    calories: f64,
    proteins: f64,
    carbs: f64,
    fats: f64,
}

#[derive(Deserialize)]
struct RawProfile {
    calories: f64,
    proteins: f64,
    carbs: f64,
    fats: f64,
}

impl From<RawProfile> for NutrientProfile {
    fn from(r: RawProfile) -> Self {
        Self::new(r.calories, r.proteins, r.carbs, r.fats)
    }
}

/// Negative, NaN and infinite inputs collapse to zero. Infinities usually mean
/// an overflowed product or sum, so they are logged.
pub(crate) fn non_negative(v: f64) -> f64 {
    if v.is_infinite() {
        warn!(value = %v, "non-finite nutrient value replaced by zero");
    }
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

impl NutrientProfile {
    pub const ZERO: Self = Self {
        calories: 0.0,
        proteins: 0.0,
        carbs: 0.0,
        fats: 0.0,
    };

    pub fn new(calories: f64, proteins: f64, carbs: f64, fats: f64) -> Self {
        Self {
            calories: non_negative(calories),
            proteins: non_negative(proteins),
            carbs: non_negative(carbs),
            fats: non_negative(fats),
        }
    }

    pub fn calories(&self) -> f64 {
        self.calories
    }
    pub fn proteins(&self) -> f64 {
        self.proteins
    }
    pub fn carbs(&self) -> f64 {
        self.carbs
    }
    pub fn fats(&self) -> f64 {
        self.fats
    }

    /// Scales every component; a non-positive or non-finite factor yields zero.
    pub fn scale(&self, factor: f64) -> Self {
        let f = non_negative(factor);
        Self::new(
            self.calories * f,
            self.proteins * f,
            self.carbs * f,
            self.fats * f,
        )
    }

    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        (self.calories - other.calories).abs() <= tolerance
            && (self.proteins - other.proteins).abs() <= tolerance
            && (self.carbs - other.carbs).abs() <= tolerance
            && (self.fats - other.fats).abs() <= tolerance
    }
}

impl Add for NutrientProfile {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.calories + rhs.calories,
            self.proteins + rhs.proteins,
            self.carbs + rhs.carbs,
            self.fats + rhs.fats,
        )
    }
}

impl Sum for NutrientProfile {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a NutrientProfile> for NutrientProfile {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// One recognized component of a dish. `total_values` is always derived from
/// `per100g` and the weight, never taken from the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    name: String,
    per100g: NutrientProfile,
    estimated_weight_grams: f64,
    total_values: NutrientProfile,
}

impl Ingredient {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn per100g(&self) -> &NutrientProfile {
        &self.per100g
    }
    pub fn estimated_weight_grams(&self) -> f64 {
        self.estimated_weight_grams
    }
    pub fn total_values(&self) -> &NutrientProfile {
        &self.total_values
    }
}
