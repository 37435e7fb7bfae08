use chrono::{Duration, Utc};
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::db;
use crate::db::entities::coupon;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    Claimed(coupon::Model),
    LimitReached,
    NotAvailable,
}

/// Hands the coupon to the user unless their rolling 24-hour quota is spent.
///
/// The quota count and the claim are two statements; callers that can race
/// against themselves (the dispatcher) serialize a user's events, so the
/// pair is only ever concurrent across distinct users. The claim statement
/// alone guarantees a coupon goes to at most one claimant.
pub async fn claim(
    coupon_id: &str,
    user_id: i64,
    quota: u64,
    db: &DatabaseConnection,
) -> Result<ClaimOutcome> {
    let since = (Utc::now() - Duration::hours(24)).naive_utc();
    if db::coupon::count_claimed_since(user_id, since, db).await? >= quota {
        return Ok(ClaimOutcome::LimitReached);
    }

    match db::coupon::claim(coupon_id, user_id, db).await? {
        Some(coupon) => {
            info!(coupon = %coupon.id, user = user_id, "coupon claimed");
            Ok(ClaimOutcome::Claimed(coupon))
        }
        None => Ok(ClaimOutcome::NotAvailable),
    }
}

#[cfg(test)]
mod test_claim {
    use super::*;
    use crate::db::coupon::Status;
    use crate::utils::get_test_db;
    use futures::future::join_all;

    #[tokio::test]
    async fn it_should_claim_an_available_coupon() {
        let db = get_test_db().await;
        let coupon = db::coupon::create(1, "SAVE10", "Canva", Some("10% off"), &db)
            .await
            .unwrap();

        let outcome = claim(&coupon.id, 7, 2, &db).await.unwrap();
        let ClaimOutcome::Claimed(claimed) = outcome else {
            panic!("expected a successful claim");
        };
        assert_eq!(claimed.status, Status::Claimed.as_str());
        assert_eq!(claimed.claimed_by, Some(7));
        assert!(claimed.claimed_at.is_some());
    }

    #[tokio::test]
    async fn it_should_hand_a_coupon_to_at_most_one_claimant() {
        let db = get_test_db().await;
        let coupon = db::coupon::create(1, "SAVE10", "Canva", None, &db).await.unwrap();

        let attempts = (0..8).map(|user| claim(&coupon.id, 100 + user, 2, &db));
        let outcomes = join_all(attempts).await;

        let mut winners = Vec::new();
        for outcome in outcomes {
            match outcome.unwrap() {
                ClaimOutcome::Claimed(claimed) => winners.push(claimed),
                ClaimOutcome::NotAvailable => {}
                ClaimOutcome::LimitReached => panic!("fresh users cannot be over quota"),
            }
        }
        assert_eq!(winners.len(), 1);

        let stored = db::coupon::get_by_id(&coupon.id, &db).await.unwrap().unwrap();
        assert_eq!(stored.claimed_by, winners[0].claimed_by);
        assert_eq!(stored.status, Status::Claimed.as_str());
    }

    #[tokio::test]
    async fn it_should_enforce_the_daily_quota() {
        let db = get_test_db().await;
        let first = db::coupon::create(1, "SAVE10", "Canva", None, &db).await.unwrap();
        let second = db::coupon::create(1, "SAVE20", "Canva", None, &db).await.unwrap();
        let third = db::coupon::create(1, "SAVE30", "Canva", None, &db).await.unwrap();

        assert!(matches!(
            claim(&first.id, 7, 2, &db).await.unwrap(),
            ClaimOutcome::Claimed(_)
        ));
        assert!(matches!(
            claim(&second.id, 7, 2, &db).await.unwrap(),
            ClaimOutcome::Claimed(_)
        ));
        assert_eq!(
            claim(&third.id, 7, 2, &db).await.unwrap(),
            ClaimOutcome::LimitReached
        );

        // The refused attempt must not have touched the record.
        let stored = db::coupon::get_by_id(&third.id, &db).await.unwrap().unwrap();
        assert_eq!(stored.status, Status::Available.as_str());
        assert_eq!(stored.claimed_by, None);

        // Another user is unaffected.
        assert!(matches!(
            claim(&third.id, 8, 2, &db).await.unwrap(),
            ClaimOutcome::Claimed(_)
        ));
    }

    #[tokio::test]
    async fn it_should_respect_a_quota_of_one() {
        let db = get_test_db().await;
        let first = db::coupon::create(1, "SAVE10", "Canva", None, &db).await.unwrap();
        let second = db::coupon::create(1, "SAVE20", "Canva", None, &db).await.unwrap();

        assert!(matches!(
            claim(&first.id, 7, 1, &db).await.unwrap(),
            ClaimOutcome::Claimed(_)
        ));
        assert_eq!(
            claim(&second.id, 7, 1, &db).await.unwrap(),
            ClaimOutcome::LimitReached
        );
    }

    #[tokio::test]
    async fn it_should_never_reopen_a_claimed_coupon() {
        let db = get_test_db().await;
        let coupon = db::coupon::create(1, "SAVE10", "Canva", None, &db).await.unwrap();

        assert!(matches!(
            claim(&coupon.id, 7, 2, &db).await.unwrap(),
            ClaimOutcome::Claimed(_)
        ));
        assert_eq!(
            claim(&coupon.id, 8, 2, &db).await.unwrap(),
            ClaimOutcome::NotAvailable
        );

        let stored = db::coupon::get_by_id(&coupon.id, &db).await.unwrap().unwrap();
        assert_eq!(stored.status, Status::Claimed.as_str());
        assert_eq!(stored.claimed_by, Some(7));
    }

    #[tokio::test]
    async fn it_should_report_unknown_coupons_as_not_available() {
        let db = get_test_db().await;
        assert_eq!(
            claim("no-such-id", 7, 2, &db).await.unwrap(),
            ClaimOutcome::NotAvailable
        );
    }
}
