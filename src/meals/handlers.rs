use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use axum_extra::extract::Form;
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument, warn};

use super::{dto::MealForm, repo, services};
use crate::{
    db::{rows::int_field, split::Split, DataAccessError, Gateway, Row},
    error::{ensure_owner, AppError, UNAUTHORIZED, UNAUTHORIZED_OR_MISSING},
    foods::repo as food_repo,
    state::AppState,
    web::{non_empty, FlashLevel, PageResult, RequestContext},
};

pub fn meal_routes() -> Router<AppState> {
    Router::new()
        .route("/meals/:id", get(list_meals))
        .route("/meals/create/:id", get(create_page).post(create_meal))
        .route("/meals/detail/:id", get(meal_detail))
        .route("/meals/edit/:id", get(edit_page).post(update_meal))
        .route("/meals/:id/delete", post(delete_meal))
}

const DETAIL_FAILED: &str = "Meal detail procedure missing or failed: ";

/// Meal detail whose header belongs to `user_id`.
async fn owned_meal(db: &dyn Gateway, user_id: i64, meal_id: i64) -> Result<Split, AppError> {
    let detail = repo::detail(db, meal_id).await?;
    let owner = detail.header.as_ref().and_then(|h| int_field(h, "userid"));
    ensure_owner(owner, user_id, UNAUTHORIZED_OR_MISSING)?;
    Ok(detail)
}

fn foods_or_empty(ctx: &mut RequestContext, lookup: Result<Vec<Row>, DataAccessError>) -> Vec<Row> {
    match lookup {
        Ok(rows) => rows,
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            Vec::new()
        }
    }
}

#[instrument(skip(state, ctx))]
pub async fn list_meals(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(user_id): Path<i64>,
) -> PageResult {
    let user = ctx.require_login()?;
    if user.user_id != user_id {
        warn!(user_id = user.user_id, target = user_id, "meal list of another user");
        return Err(ctx.deny(UNAUTHORIZED));
    }
    let db = state.db.as_ref();

    let meals = match repo::list_by_user(db, user_id).await {
        Ok(rows) => rows,
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            Vec::new()
        }
    };

    let mut meal_items = Map::new();
    for meal in &meals {
        let Some(meal_id) = int_field(meal, "meallogid") else {
            continue;
        };
        let items = match repo::detail(db, meal_id).await {
            Ok(detail) => detail.items,
            Err(e) => {
                debug!(meal_id, error = %e, "meal items unavailable");
                Vec::new()
            }
        };
        meal_items.insert(meal_id.to_string(), json!(items));
    }

    Ok(ctx.render(
        "meals/list",
        json!({ "meals": meals, "userID": user_id, "mealItems": Value::Object(meal_items) }),
    ))
}

#[instrument(skip(state, ctx))]
pub async fn create_page(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(user_id): Path<i64>,
) -> PageResult {
    let user = ctx.require_login()?;
    if user.user_id != user_id {
        return Err(ctx.deny(UNAUTHORIZED));
    }
    let foods = foods_or_empty(&mut ctx, food_repo::list(state.db.as_ref()).await);
    Ok(ctx.render("meals/create", json!({ "foods": foods, "userID": user_id })))
}

#[instrument(skip(state, ctx, form))]
pub async fn create_meal(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(user_id): Path<i64>,
    Form(form): Form<MealForm>,
) -> PageResult {
    let user = ctx.require_login()?;
    if user.user_id != user_id {
        return Err(ctx.deny(UNAUTHORIZED));
    }
    let db = state.db.as_ref();

    let outcome = async {
        let items = form.items()?;
        let meal_id = services::create_meal_with_items(
            db,
            user_id,
            non_empty(&form.meal_type),
            non_empty(&form.log_time),
            &items,
        )
        .await?;
        Ok::<_, AppError>(meal_id)
    }
    .await;

    match outcome {
        Ok(meal_id) => {
            info!(user_id, meal_id, "meal created");
            ctx.flash(FlashLevel::Success, "Meal created");
            Ok(ctx.redirect(&format!("/meals/{user_id}")))
        }
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            let foods = foods_or_empty(&mut ctx, food_repo::list(db).await);
            Ok(ctx.render("meals/create", json!({ "foods": foods, "userID": user_id })))
        }
    }
}

#[instrument(skip(state, ctx))]
pub async fn meal_detail(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(meal_id): Path<i64>,
) -> PageResult {
    let user = ctx.require_login()?;
    match owned_meal(state.db.as_ref(), user.user_id, meal_id).await {
        Ok(Split { header, items }) => Ok(ctx.render(
            "meals/detail",
            json!({ "meal": header, "items": items }),
        )),
        Err(e) => Err(ctx.refuse(e, DETAIL_FAILED)),
    }
}

#[instrument(skip(state, ctx))]
pub async fn edit_page(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(meal_id): Path<i64>,
) -> PageResult {
    let user = ctx.require_login()?;
    let db = state.db.as_ref();
    let detail = match owned_meal(db, user.user_id, meal_id).await {
        Ok(detail) => detail,
        Err(e) => return Err(ctx.refuse(e, DETAIL_FAILED)),
    };
    let foods = foods_or_empty(&mut ctx, food_repo::catalog(db).await);
    Ok(ctx.render(
        "meals/edit",
        json!({ "meal": detail.header, "items": detail.items, "foods": foods }),
    ))
}

#[instrument(skip(state, ctx, form))]
pub async fn update_meal(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(meal_id): Path<i64>,
    Form(form): Form<MealForm>,
) -> PageResult {
    let user = ctx.require_login()?;
    let db = state.db.as_ref();
    let detail = match owned_meal(db, user.user_id, meal_id).await {
        Ok(detail) => detail,
        Err(e) => return Err(ctx.refuse(e, DETAIL_FAILED)),
    };

    let outcome = async {
        let items = form.items()?;
        services::update_meal_with_items(
            db,
            meal_id,
            non_empty(&form.meal_type),
            non_empty(&form.log_time),
            &items,
        )
        .await?;
        Ok::<_, AppError>(())
    }
    .await;

    match outcome {
        Ok(()) => {
            info!(user_id = user.user_id, meal_id, "meal updated");
            ctx.flash(FlashLevel::Success, "Meal updated");
            Ok(ctx.redirect(&format!("/meals/{}", user.user_id)))
        }
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            let foods = foods_or_empty(&mut ctx, food_repo::catalog(db).await);
            Ok(ctx.render(
                "meals/edit",
                json!({ "meal": detail.header, "items": detail.items, "foods": foods }),
            ))
        }
    }
}

#[instrument(skip(state, ctx))]
pub async fn delete_meal(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(meal_id): Path<i64>,
) -> PageResult {
    let user = ctx.require_login()?;
    let db = state.db.as_ref();
    if let Err(e) = owned_meal(db, user.user_id, meal_id).await {
        return Err(ctx.refuse(e, DETAIL_FAILED));
    }

    match repo::delete(db, meal_id).await {
        Ok(()) => ctx.flash(FlashLevel::Success, "Meal deleted"),
        Err(e) => ctx.flash(FlashLevel::Error, e.to_string()),
    }
    Ok(ctx.back())
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

    fn meal_detail_rows(owner: i64) -> Value {
        json!([
            {"meallogid": 42, "userid": owner, "mealtype": "Lunch", "logtime": "2024-05-01 12:30:00"},
            {"meallogid": 42, "foodid": 1, "foodname": "Rice", "quantityingram": 150},
            {"meallogid": 42, "foodid": 2, "foodname": "Beans", "quantityingram": 80}
        ])
    }

    #[tokio::test]
    async fn list_attaches_items_per_meal() {
        let gw = ScriptedGateway::new();
        gw.on_procedure("sp_list_meals", json!([{"meallogid": 42, "userid": 7, "mealtype": "Lunch"}]))
            .on_procedure("sp_get_meal_detail", meal_detail_rows(7));
        let res = send(&gw, request(Method::GET, "/meals/7").logged_in(7)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_text(res).await;
        assert!(body.contains("Beans"));
        assert_eq!(gw.procedure_calls("sp_list_meals"), vec![vec![Param::Int(7)]]);
    }

    #[tokio::test]
    async fn list_survives_failing_detail() {
        let gw = ScriptedGateway::new();
        gw.on_procedure("sp_list_meals", json!([{"meallogid": 42, "userid": 7}]))
            .fail_procedure("sp_get_meal_detail", "boom");
        let res = send(&gw, request(Method::GET, "/meals/7").logged_in(7)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(flash_text(&res).is_empty());
    }

    #[tokio::test]
    async fn list_of_another_user_is_rejected() {
        let gw = ScriptedGateway::new();
        let res = send(&gw, request(Method::GET, "/meals/8").logged_in(7)).await;
        assert_eq!(flash_text(&res), vec!["Unauthorized"]);
        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn create_skips_the_empty_pair() {
        let gw = ScriptedGateway::new();
        gw.on_query("FROM meal_log", json!([{"meallogid": 50}]));
        let res = send(
            &gw,
            request(Method::POST, "/meals/create/7").logged_in(7).form(
                "mealType=Dinner&logTime=2024-05-01T19%3A00&foodID=1&quantityInGram=200&foodID=&quantityInGram=50&foodID=3&quantityInGram=25",
            ),
        )
        .await;
        assert_eq!(location(&res), "/meals/7");
        assert_eq!(
            gw.procedure_calls("sp_create_meal"),
            vec![vec![
                Param::Int(7),
                Param::Text("Dinner".into()),
                Param::Text("2024-05-01T19:00".into())
            ]]
        );
        assert_eq!(
            gw.procedure_calls("sp_add_meal_item"),
            vec![
                vec![Param::Int(50), Param::Int(1), Param::Int(200)],
                vec![Param::Int(50), Param::Int(3), Param::Int(25)],
            ]
        );
        assert_eq!(gw.calls().last(), Some(&Call::Commit));
    }

    #[tokio::test]
    async fn create_failure_rolls_back_and_rerenders() {
        let gw = ScriptedGateway::new();
        gw.on_query("FROM meal_log", json!([{"meallogid": 50}]))
            .fail_procedure("sp_add_meal_item", "Cannot add or update a child row");
        let res = send(
            &gw,
            request(Method::POST, "/meals/create/7")
                .logged_in(7)
                .form("mealType=Dinner&foodID=99&quantityInGram=10"),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_text(res).await.contains("Cannot add or update a child row"));
        assert!(gw.calls().contains(&Call::Rollback));
        assert!(!gw.calls().contains(&Call::Commit));
    }

    #[tokio::test]
    async fn detail_of_foreign_meal_is_rejected() {
        let gw = ScriptedGateway::new();
        gw.on_procedure("sp_get_meal_detail", meal_detail_rows(8));
        let res = send(&gw, request(Method::GET, "/meals/detail/42").logged_in(7)).await;
        assert_eq!(location(&res), "/");
        assert_eq!(flash_text(&res), vec!["Unauthorized or not found"]);
    }

    #[tokio::test]
    async fn detail_of_missing_meal_is_rejected() {
        let gw = ScriptedGateway::new();
        let res = send(&gw, request(Method::GET, "/meals/detail/42").logged_in(7)).await;
        assert_eq!(flash_text(&res), vec!["Unauthorized or not found"]);
    }

    #[tokio::test]
    async fn detail_procedure_failure_is_flashed() {
        let gw = ScriptedGateway::new();
        gw.fail_procedure("sp_get_meal_detail", "gone");
        let res = send(&gw, request(Method::GET, "/meals/detail/42").logged_in(7)).await;
        assert_eq!(location(&res), "/");
        assert!(flash_text(&res)[0].starts_with("Meal detail procedure missing or failed: "));
    }

    #[tokio::test]
    async fn edit_replaces_items_and_returns_to_list() {
        let gw = ScriptedGateway::new();
        gw.on_procedure("sp_get_meal_detail", meal_detail_rows(7));
        let res = send(
            &gw,
            request(Method::POST, "/meals/edit/42")
                .logged_in(7)
                .form("mealType=Brunch&logTime=&foodID=2&quantityInGram=120"),
        )
        .await;
        assert_eq!(location(&res), "/meals/7");
        assert_eq!(
            gw.procedure_calls("sp_update_meal"),
            vec![vec![Param::Int(42), Param::Text("Brunch".into()), Param::Null]]
        );
        assert_eq!(gw.procedure_calls("sp_clear_meal_items"), vec![vec![Param::Int(42)]]);
        assert_eq!(
            gw.procedure_calls("sp_add_meal_item"),
            vec![vec![Param::Int(42), Param::Int(2), Param::Int(120)]]
        );
    }

    #[tokio::test]
    async fn edit_page_uses_food_catalog() {
        let gw = ScriptedGateway::new();
        gw.on_procedure("sp_get_meal_detail", meal_detail_rows(7))
            .on_procedure("sp_list_foods_with_allergens", json!([{"foodid": 9, "name": "Kimchi"}]));
        let res = send(&gw, request(Method::GET, "/meals/edit/42").logged_in(7)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_text(res).await.contains("Kimchi"));
    }

    #[tokio::test]
    async fn delete_checks_owner() {
        let gw = ScriptedGateway::new();
        gw.on_procedure("sp_get_meal_detail", meal_detail_rows(8));
        let res = send(&gw, request(Method::POST, "/meals/42/delete").logged_in(7)).await;
        assert_eq!(flash_text(&res), vec!["Unauthorized or not found"]);
        assert!(gw.procedure_calls("sp_delete_meal").is_empty());
    }

    #[tokio::test]
    async fn delete_own_meal_returns_to_referer() {
        let gw = ScriptedGateway::new();
        gw.on_procedure("sp_get_meal_detail", meal_detail_rows(7));
        let res = send(
            &gw,
            request(Method::POST, "/meals/42/delete")
                .logged_in(7)
                .referer("http://localhost:8080/meals/7"),
        )
        .await;
        assert_eq!(location(&res), "/meals/7");
        assert_eq!(gw.procedure_calls("sp_delete_meal"), vec![vec![Param::Int(42)]]);
    }
}
