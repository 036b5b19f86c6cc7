use axum::{extract::State, routing::get, Form, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use super::repo::{self, NewFood};
use crate::{
    error::AppError,
    state::AppState,
    web::{non_empty, required_float, required_int, FlashLevel, PageResult, RequestContext},
};

#[derive(Debug, Deserialize)]
pub struct FoodForm {
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Calories")]
    pub calories: Option<String>,
    #[serde(rename = "Proteins")]
    pub proteins: Option<String>,
    #[serde(rename = "Carbs")]
    pub carbs: Option<String>,
    #[serde(rename = "Fats")]
    pub fats: Option<String>,
    #[serde(rename = "Allergens")]
    pub allergens: Option<String>,
}

impl FoodForm {
    fn to_food(&self) -> Result<NewFood, AppError> {
        Ok(NewFood {
            name: non_empty(&self.name).map(str::to_string),
            calories: required_int(&self.calories, "Calories")?,
            proteins: required_float(&self.proteins, "Proteins")?,
            carbs: required_float(&self.carbs, "Carbs")?,
            fats: required_float(&self.fats, "Fats")?,
        })
    }
}

pub fn food_routes() -> Router<AppState> {
    Router::new()
        .route("/foods", get(list_foods))
        .route("/foods/create", get(create_page).post(create_food))
}

#[instrument(skip(state, ctx))]
pub async fn list_foods(State(state): State<AppState>, mut ctx: RequestContext) -> PageResult {
    ctx.require_login()?;
    let foods = match repo::catalog(state.db.as_ref()).await {
        Ok(rows) => rows,
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            Vec::new()
        }
    };
    Ok(ctx.render("foods/list", json!({ "foods": foods })))
}

#[instrument(skip(ctx))]
pub async fn create_page(ctx: RequestContext) -> PageResult {
    ctx.require_login()?;
    Ok(ctx.render("foods/create", json!({})))
}

#[instrument(skip(state, ctx, form))]
pub async fn create_food(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Form(form): Form<FoodForm>,
) -> PageResult {
    let user = ctx.require_login()?;
    let outcome = async {
        let food = form.to_food()?;
        let allergens = repo::parse_allergens(form.allergens.as_deref());
        repo::create_with_allergens(state.db.as_ref(), food, &allergens).await?;
        Ok::<_, AppError>(())
    }
    .await;

    match outcome {
        Ok(()) => {
            info!(user_id = user.user_id, "food created");
            ctx.flash(FlashLevel::Success, "Food created");
            Ok(ctx.redirect("/foods"))
        }
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            Ok(ctx.render(
                "foods/create",
                json!({
                    "Name": non_empty(&form.name),
                    "Calories": non_empty(&form.calories),
                    "Proteins": non_empty(&form.proteins),
                    "Carbs": non_empty(&form.carbs),
                    "Fats": non_empty(&form.fats),
                    "Allergens": non_empty(&form.allergens),
                }),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{
            fake::{Call, ScriptedGateway},
            Param,
        },
        testing::{body_text, flash_text, location, request, send},
    };
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn list_prefers_allergen_listing() {
        let gw = ScriptedGateway::new();
        gw.on_procedure(
            "sp_list_foods_with_allergens",
            json!([{"foodid": 1, "name": "Peanut butter", "allergens": "peanuts"}]),
        );
        let res = send(&gw, request(Method::GET, "/foods").logged_in(7)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_text(res).await.contains("peanuts"));
        assert!(gw.procedure_calls("sp_list_foods").is_empty());
    }

    #[tokio::test]
    async fn create_links_allergens_to_new_food() {
        let gw = ScriptedGateway::new();
        gw.on_query("FROM food_items", json!([{"foodid": 12}]));
        let res = send(
            &gw,
            request(Method::POST, "/foods/create").logged_in(7).form(
                "Name=Granola&Calories=471&Proteins=10&Carbs=64.5&Fats=20&Allergens=nuts%2C+gluten",
            ),
        )
        .await;
        assert_eq!(location(&res), "/foods");
        assert_eq!(flash_text(&res), vec!["Food created"]);
        assert_eq!(
            gw.procedure_calls("sp_add_allergen"),
            vec![
                vec![Param::Int(12), Param::Text("nuts".into())],
                vec![Param::Int(12), Param::Text("gluten".into())],
            ]
        );
        assert_eq!(gw.calls().last(), Some(&Call::Commit));
    }

    #[tokio::test]
    async fn non_integer_calories_rerender_without_writing() {
        let gw = ScriptedGateway::new();
        let res = send(
            &gw,
            request(Method::POST, "/foods/create")
                .logged_in(7)
                .form("Name=Granola&Calories=47.5&Proteins=10&Carbs=64&Fats=20"),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_text(res).await.contains("Calories must be a whole number"));
        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_allergen_rolls_back_the_food() {
        let gw = ScriptedGateway::new();
        gw.on_query("FROM food_items", json!([{"foodid": 12}]))
            .fail_procedure("sp_add_allergen", "Data too long for column");
        let res = send(
            &gw,
            request(Method::POST, "/foods/create")
                .logged_in(7)
                .form("Name=Granola&Calories=471&Proteins=10&Carbs=64&Fats=20&Allergens=nuts"),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let calls = gw.calls();
        assert!(calls.contains(&Call::Rollback));
        assert!(!calls.contains(&Call::Commit));
    }

    #[tokio::test]
    async fn create_requires_login() {
        let gw = ScriptedGateway::new();
        let res = send(&gw, request(Method::POST, "/foods/create").form("Name=x")).await;
        assert_eq!(location(&res), "/login");
        assert!(gw.calls().is_empty());
    }
}
