use tracing::{debug, warn};

use crate::db::{
    rows::{int_field, normalize_food},
    DataAccessError, Gateway, Param, Row,
};

const LAST_FOOD_SQL: &str = "SELECT foodid FROM food_items ORDER BY foodid DESC LIMIT 1";

#[derive(Debug, Clone, PartialEq)]
pub struct NewFood {
    pub name: Option<String>,
    pub calories: i64,
    pub proteins: f64,
    pub carbs: f64,
    pub fats: f64,
}

pub async fn list(db: &dyn Gateway) -> Result<Vec<Row>, DataAccessError> {
    db.call_procedure("sp_list_foods", &[]).await
}

/// Foods with their allergens. Falls back to the plain food list, mapped
/// onto the same lowercase columns, when the allergen procedure fails.
pub async fn catalog(db: &dyn Gateway) -> Result<Vec<Row>, DataAccessError> {
    match db.call_procedure("sp_list_foods_with_allergens", &[]).await {
        Ok(rows) => Ok(rows),
        Err(e) => {
            warn!(error = %e, "allergen listing failed, using plain food list");
            let rows = list(db).await?;
            Ok(rows.iter().map(normalize_food).collect())
        }
    }
}

/// Comma separated allergen names, trimmed, blanks dropped.
pub fn parse_allergens(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

/// Inserts the food and links each allergen to it in one transaction.
pub async fn create_with_allergens(
    db: &dyn Gateway,
    food: NewFood,
    allergens: &[String],
) -> Result<(), DataAccessError> {
    let mut tx = db.begin().await?;
    tx.call_procedure(
        "sp_create_food",
        &[
            Param::from(food.name),
            food.calories.into(),
            food.proteins.into(),
            food.carbs.into(),
            food.fats.into(),
        ],
    )
    .await?;

    if !allergens.is_empty() {
        let last = tx.run_query(LAST_FOOD_SQL, &[]).await?;
        match last.first().and_then(|r| int_field(r, "foodid")) {
            Some(food_id) => {
                for allergen in allergens {
                    tx.call_procedure("sp_add_allergen", &[food_id.into(), allergen.as_str().into()])
                        .await?;
                }
                debug!(food_id, count = allergens.len(), "allergens linked");
            }
            None => warn!("no food id after insert, allergens not linked"),
        }
    }
    tx.commit().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fake::{Call, ScriptedGateway};
    use serde_json::json;

    #[test]
    fn allergens_are_split_and_trimmed() {
        assert_eq!(
            parse_allergens(Some(" nuts, ,gluten ,")),
            vec!["nuts".to_string(), "gluten".to_string()]
        );
        assert!(parse_allergens(None).is_empty());
    }

    #[tokio::test]
    async fn catalog_falls_back_to_normalized_list() {
        let gw = ScriptedGateway::new();
        gw.fail_procedure("sp_list_foods_with_allergens", "PROCEDURE wefit_db.sp_list_foods_with_allergens does not exist")
            .on_procedure("sp_list_foods", json!([{"foodID": 3, "Name": "Oats", "Calories": 389}]));
        let rows = catalog(&gw).await.unwrap();
        assert_eq!(rows[0]["foodid"], json!(3));
        assert_eq!(rows[0]["name"], json!("Oats"));
    }

    #[tokio::test]
    async fn food_without_allergens_skips_lookup() {
        let gw = ScriptedGateway::new();
        let food = NewFood {
            name: Some("Rice".into()),
            calories: 130,
            proteins: 2.7,
            carbs: 28.0,
            fats: 0.3,
        };
        create_with_allergens(&gw, food, &[]).await.unwrap();
        assert_eq!(
            gw.calls(),
            vec![
                Call::Begin,
                Call::Procedure(
                    "sp_create_food".into(),
                    vec![
                        Param::Text("Rice".into()),
                        Param::Int(130),
                        Param::Float(2.7),
                        Param::Float(28.0),
                        Param::Float(0.3),
                    ]
                ),
                Call::Commit,
            ]
        );
    }
}
