//! External collaborator contracts.
//!
//! The core consumes these seams without knowing the implementations: an
//! AI/content backend that materializes generated lessons, and a payment
//! handoff that opens an external deep link. Both are object-safe so hosts
//! can inject test doubles.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use lgk_schemas::{ContentKey, ContentType, CreditPackage, SubscriptionLevel, SubscriptionPlan};

// ---------------------------------------------------------------------------
// Content fetch
// ---------------------------------------------------------------------------

/// Parameters for one generated-lesson fetch.
#[derive(Clone, Debug)]
pub struct LessonRequest {
    pub key: ContentKey,
    pub content_type: ContentType,
    pub language: String,
}

/// Opaque lesson payload returned by the collaborator. The core stores and
/// serves it; it never inspects `body`.
#[derive(Clone, Debug, PartialEq)]
pub struct LessonPayload {
    pub title: Option<String>,
    pub body: Value,
    /// Optional price the generator attaches to the produced content.
    pub price: Option<u32>,
}

/// Transient fetch failure. The core treats it as deny-equivalent: abort the
/// request, surface a loading-failed state, apply no charge. Retry is a user
/// action, not an internal loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError(pub String);

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transient content fetch failure: {}", self.0)
    }
}

impl std::error::Error for FetchError {}

/// Content-generation collaborator.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch_lesson(&self, request: &LessonRequest) -> Result<LessonPayload, FetchError>;
}

// ---------------------------------------------------------------------------
// Payment handoff
// ---------------------------------------------------------------------------

/// External payment collaborator: receives a pre-formatted message and deep
/// link, returns nothing. Fire-and-forget by contract — the core never
/// awaits a payment result; credit top-ups arrive later as admin-side
/// remote pushes.
pub trait PaymentHandoff: Send + Sync {
    fn open_external(&self, message: &str, link: &str);
}

/// Purchase request text for a credit package.
pub fn format_package_message(user_id: &str, package: &CreditPackage) -> String {
    format!(
        "Hello Admin, I want to buy credits.\n\nUser ID: {user_id}\nPackage: {}\nAmount: {}\nCredits: {}\n\nPlease check my payment.",
        package.name, package.price, package.credits
    )
}

/// Purchase request text for a subscription plan at a chosen level.
pub fn format_plan_message(
    user_id: &str,
    plan: &SubscriptionPlan,
    level: SubscriptionLevel,
) -> String {
    let price = match level {
        SubscriptionLevel::Basic => plan.basic_price,
        SubscriptionLevel::Ultra => plan.ultra_price,
    };
    format!(
        "Hello Admin, I want to buy a subscription.\n\nUser ID: {user_id}\nPlan: {} ({})\nAmount: {price}\nFeatures: {}\n\nPlease check my payment.",
        plan.name,
        level.as_str(),
        plan.features.join(", ")
    )
}

/// Deep link carrying the message to the configured payment contact.
pub fn payment_link(contact: &str, message: &str) -> String {
    format!("https://wa.me/{contact}?text={}", percent_encode(message))
}

/// Minimal application/x-www-form-urlencoded-style escaper for the deep
/// link query. Unreserved characters pass through; everything else becomes
/// `%XX` per UTF-8 byte.
fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn package() -> CreditPackage {
        CreditPackage {
            id: "pkg-1".to_string(),
            name: "Starter Pack".to_string(),
            price: 100,
            credits: 150,
        }
    }

    #[test]
    fn package_message_carries_identity_and_amounts() {
        let msg = format_package_message("u-1", &package());
        assert!(msg.contains("User ID: u-1"));
        assert!(msg.contains("Starter Pack"));
        assert!(msg.contains("Credits: 150"));
    }

    #[test]
    fn plan_message_picks_the_level_price() {
        let plan = SubscriptionPlan {
            id: "monthly".to_string(),
            name: "Monthly".to_string(),
            duration: "30 days".to_string(),
            basic_price: 149,
            ultra_price: 199,
            features: vec!["Premium Content".to_string()],
            popular: true,
        };
        let basic = format_plan_message("u-1", &plan, SubscriptionLevel::Basic);
        assert!(basic.contains("Amount: 149"));
        let ultra = format_plan_message("u-1", &plan, SubscriptionLevel::Ultra);
        assert!(ultra.contains("Amount: 199"));
        assert!(ultra.contains("(ULTRA)"));
    }

    #[test]
    fn deep_link_is_url_safe() {
        let link = payment_link("911234567890", "hello world & more");
        assert_eq!(
            link,
            "https://wa.me/911234567890?text=hello%20world%20%26%20more"
        );
    }

    #[test]
    fn percent_encode_handles_multibyte_utf8() {
        assert_eq!(percent_encode("₹"), "%E2%82%B9");
    }
}
