use async_trait::async_trait;

/// Membership check consulted before any claim mutation.
#[async_trait]
pub trait MembershipGate: Send + Sync {
    /// Fail-closed: implementations answer `false` when the check itself
    /// fails.
    async fn is_member(&self, user_id: i64) -> bool;

    /// Handle of the channel users are asked to join, e.g. "@dealdrop".
    fn channel(&self) -> &str;
}
