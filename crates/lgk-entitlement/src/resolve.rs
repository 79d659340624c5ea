use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lgk_config::SystemSettings;
use lgk_schemas::{CatalogRecord, ContentType, Role, SubscriptionLevel, User};

use crate::pricing::effective_price;

// ---------------------------------------------------------------------------
// Decision types
// ---------------------------------------------------------------------------

/// Why access was granted without a charge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllowReason {
    AdminBypass,
    FreeContent,
    SubscriptionUltra,
    SubscriptionBasic,
}

/// Why access was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    /// Expected catalog gap, not an error state: nothing was ever authored
    /// for this tier of the chapter.
    NotUploaded,
    InsufficientCredits,
}

/// Outcome of one entitlement evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessDecision {
    Allow { reason: AllowReason },
    /// The caller must invoke the wallet ledger for `price` credits before
    /// granting access.
    AllowAfterCharge { price: u32 },
    Deny { reason: DenyReason },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, AccessDecision::Deny { .. })
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Inputs for one evaluation. `admin_impersonation` is session state, not
/// user state: an admin browsing as a student keeps full bypass.
#[derive(Clone, Copy, Debug)]
pub struct AccessContext<'a> {
    pub user: &'a User,
    pub admin_impersonation: bool,
    pub now: DateTime<Utc>,
}

impl<'a> AccessContext<'a> {
    pub fn new(user: &'a User, now: DateTime<Utc>) -> Self {
        Self {
            user,
            admin_impersonation: false,
            now,
        }
    }

    pub fn impersonated(user: &'a User, now: DateTime<Utc>) -> Self {
        Self {
            user,
            admin_impersonation: true,
            now,
        }
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Content types a `Basic` subscription unlocks without per-item charge.
///
/// This list is the canonical set; call sites must not grow or shrink it
/// locally. Everything else (ultra PDFs, video lectures) stays charge-gated
/// for Basic and falls through to the credit rule.
pub const BASIC_CONTENT_TYPES: [ContentType; 4] = [
    ContentType::McqPractice,
    ContentType::PremiumNotes,
    ContentType::AiNotes,
    ContentType::FreeNotes,
];

/// Evaluate one content request. Rules run in strict order; first match wins.
///
/// 1. Admin role or admin impersonation → allow.
/// 2. No effective price (tier never authored) → deny `NotUploaded`.
/// 3. Price 0 → allow.
/// 4. Active subscription: Ultra allows everything; Basic allows only
///    [`BASIC_CONTENT_TYPES`], otherwise falls through.
/// 5. Sufficient credits → allow-after-charge.
/// 6. Deny `InsufficientCredits`.
pub fn resolve(
    ctx: &AccessContext<'_>,
    content_type: ContentType,
    record: Option<&CatalogRecord>,
    settings: &SystemSettings,
) -> AccessDecision {
    // 1) Admins and impersonating admins bypass every charge.
    if ctx.user.role == Role::Admin || ctx.admin_impersonation {
        return AccessDecision::Allow {
            reason: AllowReason::AdminBypass,
        };
    }

    // 2) No price means no content: expected catalog gap.
    let Some(price) = effective_price(record, content_type, settings) else {
        return AccessDecision::Deny {
            reason: DenyReason::NotUploaded,
        };
    };

    // 3) Exists and free.
    if price == 0 {
        return AccessDecision::Allow {
            reason: AllowReason::FreeContent,
        };
    }

    // 4) Active subscription. Expired subscriptions were already filtered by
    //    is_active; lingering flags never grant access.
    if ctx.user.subscription.is_active(ctx.now) {
        match ctx.user.subscription.level {
            SubscriptionLevel::Ultra => {
                return AccessDecision::Allow {
                    reason: AllowReason::SubscriptionUltra,
                };
            }
            SubscriptionLevel::Basic => {
                if BASIC_CONTENT_TYPES.contains(&content_type) {
                    return AccessDecision::Allow {
                        reason: AllowReason::SubscriptionBasic,
                    };
                }
                // Basic does not cover this type; fall through to credits.
            }
        }
    }

    // 5) Spendable balance covers the price.
    if ctx.user.credits >= price {
        return AccessDecision::AllowAfterCharge { price };
    }

    // 6) Nothing left to grant access with.
    AccessDecision::Deny {
        reason: DenyReason::InsufficientCredits,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lgk_schemas::Subscription;

    fn now() -> DateTime<Utc> {
        "2026-03-01T10:00:00Z".parse().unwrap()
    }

    fn settings() -> SystemSettings {
        SystemSettings::default()
    }

    fn student(credits: u32) -> User {
        let mut user = User::new_student("u-1", "Asha", now() - Duration::days(30));
        user.credits = credits;
        user
    }

    fn subscribed(level: SubscriptionLevel, hours_left: i64) -> User {
        let mut user = student(0);
        user.subscription = Subscription {
            tier: Some("WEEKLY".to_string()),
            level,
            expires_at: Some(now() + Duration::hours(hours_left)),
            is_premium: true,
            granted_by_admin: false,
        };
        user
    }

    fn full_record() -> CatalogRecord {
        CatalogRecord {
            free_notes_html: Some("free".to_string()),
            premium_notes_html: Some("premium".to_string()),
            ultra_pdf_link: Some("https://example.invalid/u.pdf".to_string()),
            free_video_link: Some("https://example.invalid/v".to_string()),
            ai_payload: Some(serde_json::json!({"mcqs": []})),
            ..CatalogRecord::default()
        }
    }

    #[test]
    fn admin_is_never_denied() {
        let mut admin = student(0);
        admin.role = Role::Admin;
        let ctx = AccessContext::new(&admin, now());
        for ct in ContentType::ALL {
            // Even with no catalog record at all.
            let decision = resolve(&ctx, ct, None, &settings());
            assert_eq!(
                decision,
                AccessDecision::Allow {
                    reason: AllowReason::AdminBypass
                },
                "{ct}"
            );
        }
    }

    #[test]
    fn impersonation_bypasses_like_admin() {
        let user = student(0);
        let ctx = AccessContext::impersonated(&user, now());
        let decision = resolve(&ctx, ContentType::UltraPdf, None, &settings());
        assert!(decision.is_allowed());
    }

    #[test]
    fn absent_price_is_never_allowed_for_students() {
        // Rich user, active ultra sub — still NOT_UPLOADED without a payload.
        let mut user = subscribed(SubscriptionLevel::Ultra, 4);
        user.credits = 1_000;
        let ctx = AccessContext::new(&user, now());
        for ct in ContentType::ALL {
            let decision = resolve(&ctx, ct, Some(&CatalogRecord::default()), &settings());
            assert_eq!(
                decision,
                AccessDecision::Deny {
                    reason: DenyReason::NotUploaded
                },
                "{ct}"
            );
        }
    }

    #[test]
    fn zero_price_allows_without_charge() {
        let user = student(0);
        let ctx = AccessContext::new(&user, now());
        let decision = resolve(&ctx, ContentType::FreeNotes, Some(&full_record()), &settings());
        assert_eq!(
            decision,
            AccessDecision::Allow {
                reason: AllowReason::FreeContent
            }
        );
    }

    #[test]
    fn ultra_subscription_allows_every_content_type() {
        let user = subscribed(SubscriptionLevel::Ultra, 4);
        let ctx = AccessContext::new(&user, now());
        let record = full_record();
        for ct in ContentType::ALL {
            let decision = resolve(&ctx, ct, Some(&record), &settings());
            assert!(decision.is_allowed(), "{ct} must be allowed for ultra");
            assert!(
                !matches!(decision, AccessDecision::AllowAfterCharge { .. }),
                "{ct} must not charge an ultra subscriber"
            );
        }
    }

    #[test]
    fn basic_subscription_covers_only_the_canonical_set() {
        let user = subscribed(SubscriptionLevel::Basic, 4);
        let ctx = AccessContext::new(&user, now());
        let record = full_record();

        for ct in BASIC_CONTENT_TYPES {
            assert!(
                resolve(&ctx, ct, Some(&record), &settings()).is_allowed(),
                "{ct} is in the basic set"
            );
        }
        // Ultra PDF and video fall through to credits; with none, deny.
        for ct in [ContentType::UltraPdf, ContentType::VideoLecture] {
            assert_eq!(
                resolve(&ctx, ct, Some(&record), &settings()),
                AccessDecision::Deny {
                    reason: DenyReason::InsufficientCredits
                },
                "{ct} is not covered by basic"
            );
        }
    }

    #[test]
    fn expired_subscription_is_treated_as_absent() {
        let user = subscribed(SubscriptionLevel::Ultra, -1);
        let ctx = AccessContext::new(&user, now());
        let decision = resolve(&ctx, ContentType::PremiumNotes, Some(&full_record()), &settings());
        assert_eq!(
            decision,
            AccessDecision::Deny {
                reason: DenyReason::InsufficientCredits
            }
        );
    }

    #[test]
    fn sufficient_credits_yield_charge_decision() {
        let user = student(5);
        let ctx = AccessContext::new(&user, now());
        let decision = resolve(&ctx, ContentType::PremiumNotes, Some(&full_record()), &settings());
        assert_eq!(decision, AccessDecision::AllowAfterCharge { price: 5 });
    }

    #[test]
    fn insufficient_credits_deny() {
        let user = student(4);
        let ctx = AccessContext::new(&user, now());
        let decision = resolve(&ctx, ContentType::PremiumNotes, Some(&full_record()), &settings());
        assert_eq!(
            decision,
            AccessDecision::Deny {
                reason: DenyReason::InsufficientCredits
            }
        );
    }

    #[test]
    fn exact_balance_is_sufficient() {
        let mut user = student(10);
        user.credits = 10;
        let ctx = AccessContext::new(&user, now());
        let decision = resolve(&ctx, ContentType::UltraPdf, Some(&full_record()), &settings());
        assert_eq!(decision, AccessDecision::AllowAfterCharge { price: 10 });
    }

    #[test]
    fn resolve_never_mutates_its_inputs() {
        let user = student(5);
        let before = user.clone();
        let ctx = AccessContext::new(&user, now());
        let _ = resolve(&ctx, ContentType::PremiumNotes, Some(&full_record()), &settings());
        assert_eq!(user, before);
    }
}
