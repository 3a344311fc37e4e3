use std::collections::BTreeSet;
use std::sync::Arc;

use mess_types::UserId;

use crate::config::AuthorizationConfig;
use crate::request::Caller;

/// Authorization hook consulted before any cross-user mutation.
///
/// The engine only asks; it never decides policy itself. Implementations
/// must be cheap and side-effect free.
pub trait AuthorizationPolicy: Send + Sync {
    /// May `caller` credit coupons to `user_id`?
    fn can_credit_coupons(&self, caller: &Caller, user_id: &UserId) -> bool;

    /// May `caller` redeem `user_id`'s coupons?
    fn can_redeem_for(&self, caller: &Caller, user_id: &UserId) -> bool;

    /// May `caller` read `user_id`'s balances and audit trail?
    fn can_view(&self, caller: &Caller, user_id: &UserId) -> bool {
        caller.is(user_id)
    }
}

/// Default policy: callers may only act on their own account.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelfOnly;

impl AuthorizationPolicy for SelfOnly {
    fn can_credit_coupons(&self, caller: &Caller, user_id: &UserId) -> bool {
        caller.is(user_id)
    }

    fn can_redeem_for(&self, caller: &Caller, user_id: &UserId) -> bool {
        caller.is(user_id)
    }
}

/// Self-only, widened by configured roles.
#[derive(Clone, Debug, Default)]
pub struct RolePolicy {
    coupon_issuers: BTreeSet<String>,
    redeemers: BTreeSet<String>,
    viewers: BTreeSet<String>,
}

impl RolePolicy {
    pub fn from_config(config: &AuthorizationConfig) -> Self {
        Self {
            coupon_issuers: config.coupon_issuers.iter().cloned().collect(),
            redeemers: config.redeemers.iter().cloned().collect(),
            viewers: config.viewers.iter().cloned().collect(),
        }
    }
}

impl AuthorizationPolicy for RolePolicy {
    fn can_credit_coupons(&self, caller: &Caller, user_id: &UserId) -> bool {
        caller.is(user_id) || caller.has_any_role(&self.coupon_issuers)
    }

    fn can_redeem_for(&self, caller: &Caller, user_id: &UserId) -> bool {
        caller.is(user_id) || caller.has_any_role(&self.redeemers)
    }

    fn can_view(&self, caller: &Caller, user_id: &UserId) -> bool {
        caller.is(user_id) || caller.has_any_role(&self.viewers)
    }
}

/// Build the policy a deployment configured.
pub fn policy_from_config(config: &AuthorizationConfig) -> Arc<dyn AuthorizationPolicy> {
    if config.is_self_only() {
        Arc::new(SelfOnly)
    } else {
        Arc::new(RolePolicy::from_config(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn caller(id: &str) -> Caller {
        Caller::new(user(id))
    }

    #[test]
    fn self_only_allows_owner() {
        let policy = SelfOnly;
        assert!(policy.can_credit_coupons(&caller("u1"), &user("u1")));
        assert!(policy.can_redeem_for(&caller("u1"), &user("u1")));
        assert!(policy.can_view(&caller("u1"), &user("u1")));
    }

    #[test]
    fn self_only_rejects_others_regardless_of_roles() {
        let policy = SelfOnly;
        let staff = caller("staff").with_role("mess_staff");
        assert!(!policy.can_credit_coupons(&staff, &user("u1")));
        assert!(!policy.can_redeem_for(&staff, &user("u1")));
        assert!(!policy.can_view(&staff, &user("u1")));
    }

    #[test]
    fn role_policy_widens_per_capability() {
        let policy = RolePolicy::from_config(&AuthorizationConfig {
            coupon_issuers: vec!["mess_owner".into()],
            redeemers: vec!["mess_staff".into()],
            viewers: vec![],
        });

        let owner = caller("o1").with_role("mess_owner");
        let staff = caller("s1").with_role("mess_staff");

        assert!(policy.can_credit_coupons(&owner, &user("u1")));
        assert!(!policy.can_redeem_for(&owner, &user("u1")));

        assert!(policy.can_redeem_for(&staff, &user("u1")));
        assert!(!policy.can_credit_coupons(&staff, &user("u1")));

        assert!(!policy.can_view(&staff, &user("u1")));
        assert!(policy.can_view(&caller("u1"), &user("u1")));
    }

    #[test]
    fn empty_config_builds_self_only() {
        let policy = policy_from_config(&AuthorizationConfig::default());
        let admin = caller("admin").with_role("admin");
        assert!(!policy.can_credit_coupons(&admin, &user("u1")));
    }
}
