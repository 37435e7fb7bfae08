use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

use crate::db::{self, coupon::Status};
use crate::error::DealdropError;

#[derive(Clone)]
pub struct ApiState {
    pub db: DatabaseConnection,
    pub auth: String,
}

#[derive(Deserialize)]
pub struct QueryCoupons {
    status: Option<String>,
    platform: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn get_coupons(
    Query(params): Query<QueryCoupons>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, DealdropError> {
    let status = match params.status.as_deref() {
        Some(value) => Some(
            Status::parse(value)
                .ok_or_else(|| DealdropError::Api(format!("unknown status: {value}")))?,
        ),
        None => None,
    };

    let list = db::coupon::list(
        status,
        params.platform.as_deref(),
        params.limit,
        params.offset,
        &state.db,
    )
    .await?;
    Ok(Json(list))
}

pub async fn get_coupon(
    Path(id): Path<String>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, DealdropError> {
    match db::coupon::get_by_id(&id, &state.db).await? {
        Some(coupon) => Ok((StatusCode::OK, Json(coupon)).into_response()),
        None => Ok((StatusCode::NOT_FOUND, ()).into_response()),
    }
}

#[cfg(test)]
mod test_api {
    use super::*;
    use crate::utils::get_test_api;
    use serde_json::Value;

    #[tokio::test]
    async fn it_should_require_auth() {
        let (server, _db) = get_test_api().await;
        server
            .get("/api/v1/health")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn it_should_report_health() {
        let (server, _db) = get_test_api().await;
        server
            .get("/api/v1/health")
            .add_header("authorization", "test")
            .await
            .assert_status_success();
    }

    #[tokio::test]
    async fn it_should_list_coupons() {
        let (server, db) = get_test_api().await;
        db::coupon::create(1, "SAVE10", "Canva", Some("10% off"), &db)
            .await
            .unwrap();
        db::coupon::create(2, "FRESH42", "Amazon", None, &db)
            .await
            .unwrap();

        let coupons: Value = server
            .get("/api/v1/coupons")
            .add_header("authorization", "test")
            .await
            .json();
        assert_eq!(coupons.as_array().unwrap().len(), 2);

        let coupons: Value = server
            .get("/api/v1/coupons")
            .add_query_param("platform", "canva")
            .add_header("authorization", "test")
            .await
            .json();
        let coupons = coupons.as_array().unwrap();
        assert_eq!(coupons.len(), 1);
        assert_eq!(coupons[0]["code"], "SAVE10");
    }

    #[tokio::test]
    async fn it_should_reject_unknown_status_filters() {
        let (server, _db) = get_test_api().await;
        server
            .get("/api/v1/coupons")
            .add_query_param("status", "BOGUS")
            .add_header("authorization", "test")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn it_should_get_a_coupon() {
        let (server, db) = get_test_api().await;
        let coupon = db::coupon::create(1, "SAVE10", "Canva", None, &db)
            .await
            .unwrap();

        let path = format!("/api/v1/coupons/{}", coupon.id);
        let fetched: Value = server
            .get(&path)
            .add_header("authorization", "test")
            .await
            .json();
        assert_eq!(fetched["id"], coupon.id.as_str());
        assert_eq!(fetched["status"], "AVAILABLE");

        server
            .get("/api/v1/coupons/no-such-id")
            .add_header("authorization", "test")
            .await
            .assert_status_not_found();
    }
}
