/// Literal value of `message` the model uses when no food is visible.
pub const NO_FOOD_SENTINEL: &str = "noFood";

/// Instruction block sent with every photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSpec {
    pub instructions: String,
}

impl Default for PromptSpec {
    fn default() -> Self {
        Self {
            instructions: food_analysis_instructions(),
        }
    }
}

fn food_analysis_instructions() -> String {
    format!(
        r#"You are a nutrition assistant. Identify the dish in the photo and every visible ingredient.
For each ingredient estimate its weight in grams and give typical nutrient values per 100 g.
Reply with exactly one JSON object and nothing else, using this shape:
{{
  "name": "dish name",
  "description": "one short sentence describing the dish",
  "ingredients": [
    {{
      "name": "ingredient name",
      "per100g": {{ "calories": 0, "proteins": 0, "carbs": 0, "fats": 0 }},
      "estimatedWeight": 0,
      "totalValues": {{ "calories": 0, "proteins": 0, "carbs": 0, "fats": 0 }}
    }}
  ],
  "totalNutrients": {{ "calories": 0, "proteins": 0, "carbs": 0, "fats": 0 }}
}}
Calories are kcal, proteins/carbs/fats are grams, all values are plain numbers.
If there is no food in the photo reply with exactly {{"message":"{NO_FOOD_SENTINEL}"}}."#
    )
}
