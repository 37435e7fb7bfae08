// Dealdrop
// Copyright (C) 2026 Throneless Tech

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use chrono::{NaiveDateTime, Utc};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::*;
use std::fmt;
use uuid;

use super::entities::{prelude::*, *};
use crate::error::Result;

/// Coupon lifecycle. A coupon is created `Available`, is claimed at most
/// once, and never returns to `Available` afterwards. `Expired` and
/// `Removed` are terminal states set by moderation outside the claim path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Available,
    Claimed,
    Expired,
    Removed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Available => "AVAILABLE",
            Status::Claimed => "CLAIMED",
            Status::Expired => "EXPIRED",
            Status::Removed => "REMOVED",
        }
    }

    pub fn parse(value: &str) -> Option<Status> {
        match value.to_uppercase().as_str() {
            "AVAILABLE" => Some(Status::Available),
            "CLAIMED" => Some(Status::Claimed),
            "EXPIRED" => Some(Status::Expired),
            "REMOVED" => Some(Status::Removed),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub async fn create(
    submitted_by: i64,
    code: &str,
    platform: &str,
    details: Option<&str>,
    db: &DatabaseConnection,
) -> Result<coupon::Model> {
    let entry = coupon::ActiveModel {
        id: ActiveValue::Set(uuid::Uuid::new_v4().to_string()),
        code: ActiveValue::Set(code.trim().to_owned()),
        platform: ActiveValue::Set(platform.trim().to_owned()),
        details: ActiveValue::Set(details.map(|d| d.trim().chars().take(500).collect())),
        submitted_by: ActiveValue::Set(submitted_by),
        status: ActiveValue::Set(Status::Available.as_str().to_owned()),
        ..Default::default()
    };
    Ok(entry.insert(db).await?)
}

pub async fn get_by_id(id: &str, db: &DatabaseConnection) -> Result<Option<coupon::Model>> {
    Ok(Coupon::find_by_id(id).one(db).await?)
}

pub async fn list(
    status: Option<Status>,
    platform: Option<&str>,
    limit: Option<u64>,
    offset: Option<u64>,
    db: &DatabaseConnection,
) -> Result<Vec<coupon::Model>> {
    let mut query = Coupon::find();
    if let Some(status) = status {
        query = query.filter(coupon::Column::Status.eq(status.as_str()));
    }
    if let Some(platform) = platform {
        query = query.filter(
            Expr::expr(Func::lower(Expr::col(coupon::Column::Platform)))
                .eq(platform.to_lowercase()),
        );
    }
    let entries = query
        .order_by(coupon::Column::SubmittedAt, Order::Desc)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?;

    Ok(entries)
}

pub async fn list_available(
    platform: &str,
    limit: u64,
    db: &DatabaseConnection,
) -> Result<Vec<coupon::Model>> {
    let entries = Coupon::find()
        .filter(coupon::Column::Status.eq(Status::Available.as_str()))
        .filter(coupon::Column::ClaimedBy.is_null())
        .filter(
            Expr::expr(Func::lower(Expr::col(coupon::Column::Platform)))
                .eq(platform.to_lowercase()),
        )
        .order_by(coupon::Column::SubmittedAt, Order::Desc)
        .limit(limit)
        .all(db)
        .await?;

    Ok(entries)
}

pub async fn available_platforms(db: &DatabaseConnection) -> Result<Vec<String>> {
    let entries = Coupon::find()
        .select_only()
        .column(coupon::Column::Platform)
        .filter(coupon::Column::Status.eq(Status::Available.as_str()))
        .filter(coupon::Column::ClaimedBy.is_null())
        .group_by(coupon::Column::Platform)
        .order_by(coupon::Column::Platform, Order::Asc)
        .into_tuple::<String>()
        .all(db)
        .await?;

    Ok(entries)
}

pub async fn count_claimed_since(
    user_id: i64,
    since: NaiveDateTime,
    db: &DatabaseConnection,
) -> Result<u64> {
    let count = Coupon::find()
        .filter(coupon::Column::ClaimedBy.eq(user_id))
        .filter(coupon::Column::ClaimedAt.gte(since.to_string()))
        .count(db)
        .await?;

    Ok(count)
}

/// Conditionally transitions one coupon from `Available` to `Claimed`.
///
/// The status/claimed_by precondition lives in the UPDATE itself: of any
/// number of concurrent claimants for one id, at most one sees a row
/// affected. Everyone else gets `None`.
pub async fn claim(
    id: &str,
    user_id: i64,
    db: &DatabaseConnection,
) -> Result<Option<coupon::Model>> {
    let now = Utc::now().naive_utc();
    let updated = Coupon::update_many()
        .col_expr(
            coupon::Column::Status,
            Expr::value(Status::Claimed.as_str()),
        )
        .col_expr(coupon::Column::ClaimedBy, Expr::value(user_id))
        .col_expr(coupon::Column::ClaimedAt, Expr::value(now.to_string()))
        .filter(coupon::Column::Id.eq(id))
        .filter(coupon::Column::Status.eq(Status::Available.as_str()))
        .filter(coupon::Column::ClaimedBy.is_null())
        .exec(db)
        .await?;

    if updated.rows_affected == 0 {
        return Ok(None);
    }

    Ok(Coupon::find_by_id(id).one(db).await?)
}

#[cfg(test)]
mod test_coupon {
    use super::*;
    use crate::utils::get_test_db;

    #[tokio::test]
    async fn it_should_list_available_by_platform_case_insensitively() {
        let db = get_test_db().await;
        create(1, "SAVE10", "Canva", Some("10% off"), &db).await.unwrap();
        create(2, "SAVE20", "Amazon", None, &db).await.unwrap();

        let canva = list_available("canva", 10, &db).await.unwrap();
        assert_eq!(canva.len(), 1);
        assert_eq!(canva[0].code, "SAVE10");
    }

    #[tokio::test]
    async fn it_should_list_distinct_available_platforms() {
        let db = get_test_db().await;
        create(1, "SAVE10", "Canva", None, &db).await.unwrap();
        create(2, "SAVE20", "Canva", None, &db).await.unwrap();
        create(3, "SAVE30", "Amazon", None, &db).await.unwrap();

        let platforms = available_platforms(&db).await.unwrap();
        assert_eq!(platforms, vec!["Amazon".to_owned(), "Canva".to_owned()]);

        let amazon = list_available("Amazon", 10, &db).await.unwrap();
        claim(&amazon[0].id, 9, &db).await.unwrap();

        let platforms = available_platforms(&db).await.unwrap();
        assert_eq!(platforms, vec!["Canva".to_owned()]);
    }

    #[tokio::test]
    async fn it_should_truncate_oversized_details() {
        let db = get_test_db().await;
        let long = "x".repeat(600);
        let coupon = create(1, "SAVE10", "Canva", Some(&long), &db).await.unwrap();
        assert_eq!(coupon.details.unwrap().chars().count(), 500);
    }
}
