use serde::Deserialize;

use crate::error::AppError;

/// Meal header plus the parallel `foodID` / `quantityInGram` lists of the
/// item rows.
#[derive(Debug, Default, Deserialize)]
pub struct MealForm {
    #[serde(rename = "mealType")]
    pub meal_type: Option<String>,
    #[serde(rename = "logTime")]
    pub log_time: Option<String>,
    #[serde(rename = "foodID", default)]
    pub food_ids: Vec<String>,
    #[serde(rename = "quantityInGram", default)]
    pub quantities: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MealItem {
    pub food_id: i64,
    pub quantity: i64,
}

impl MealForm {
    /// Zips the item lists in submission order. The shorter list wins and
    /// pairs with a blank side are skipped.
    pub fn items(&self) -> Result<Vec<MealItem>, AppError> {
        self.food_ids
            .iter()
            .zip(&self.quantities)
            .map(|(food, qty)| (food.trim(), qty.trim()))
            .filter(|(food, qty)| !food.is_empty() && !qty.is_empty())
            .map(|(food, qty)| {
                Ok(MealItem {
                    food_id: whole(food, "foodID")?,
                    quantity: whole(qty, "quantityInGram")?,
                })
            })
            .collect()
    }
}

fn whole(raw: &str, field: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| AppError::Invalid(format!("{field} must be a whole number")))
}
