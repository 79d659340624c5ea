//! Content request orchestration.
//!
//! One selection action flows through: catalog read → (for generated types)
//! collaborator fetch → entitlement resolution → wallet charge → grant.
//! The fetch happens *before* any charge, so a transient collaborator
//! failure aborts with the balance untouched.

use std::fmt;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use lgk_entitlement::{resolve, AccessContext, AccessDecision, DenyReason};
use lgk_schemas::{CatalogRecord, ContentKey, ContentType};
use lgk_store::StoreError;
use lgk_wallet::WalletError;

use crate::collaborators::LessonRequest;
use crate::context::SessionContext;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A granted piece of content, ready for the presentation layer.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentGrant {
    pub content_type: ContentType,
    /// Opaque payload: `{"html": …}`, `{"url": …}`, `{"playlist": […]}`, or
    /// the generated lesson body.
    pub payload: Value,
    /// Credits actually charged for this grant (0 for free/subscription
    /// access).
    pub charged: u32,
}

/// Why a content request failed. All variants surface synchronously to the
/// triggering action and leave local state uncorrupted.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentError {
    /// Expected catalog gap: nothing authored for this tier yet.
    NotUploaded,
    InsufficientCredits { required: u32, available: u32 },
    /// Transient collaborator failure; retry is a user action. No charge was
    /// applied.
    FetchFailed(String),
    Store(StoreError),
    Wallet(WalletError),
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentError::NotUploaded => write!(f, "content not uploaded for this chapter"),
            ContentError::InsufficientCredits {
                required,
                available,
            } => write!(f, "insufficient credits: need {required}, have {available}"),
            ContentError::FetchFailed(msg) => write!(f, "content fetch failed: {msg}"),
            ContentError::Store(err) => write!(f, "{err}"),
            ContentError::Wallet(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ContentError {}

impl From<StoreError> for ContentError {
    fn from(err: StoreError) -> Self {
        ContentError::Store(err)
    }
}

impl From<WalletError> for ContentError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::InsufficientCredits {
                required,
                available,
            } => ContentError::InsufficientCredits {
                required,
                available,
            },
            other => ContentError::Wallet(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Request flow
// ---------------------------------------------------------------------------

impl SessionContext {
    /// Resolve and, when required, charge for one piece of content.
    pub async fn request_content(
        &self,
        key: &ContentKey,
        content_type: ContentType,
        language: &str,
    ) -> Result<ContentGrant, ContentError> {
        let now = Utc::now();
        let composite = key.composite();

        let mut record: Option<CatalogRecord> = match self.store.read(&composite).await? {
            Some(raw) => serde_json::from_value(raw).ok(),
            None => None,
        };

        // Generated content is materialized on first request — before any
        // entitlement check, so a fetch failure can never cost credits.
        let needs_generation = content_type.is_generated()
            && !record
                .as_ref()
                .map(|r| r.has_payload(content_type))
                .unwrap_or(false);
        if needs_generation {
            let payload = self
                .fetcher
                .fetch_lesson(&LessonRequest {
                    key: key.clone(),
                    content_type,
                    language: language.to_string(),
                })
                .await
                .map_err(|e| ContentError::FetchFailed(e.0))?;

            let mut updated = record.unwrap_or_default();
            updated.ai_payload = Some(payload.body);
            if updated.price.is_none() {
                updated.price = payload.price;
            }
            let encoded = serde_json::to_value(&updated)
                .map_err(|e| StoreError::Encode(format!("encode catalog record: {e}")))?;
            self.store.write(&composite, encoded).await?;
            record = Some(updated);
        }

        let user = self.user().await;
        let settings = self.settings().await;
        let ctx = if self.is_impersonating().await {
            AccessContext::impersonated(&user, now)
        } else {
            AccessContext::new(&user, now)
        };

        let charged = match resolve(&ctx, content_type, record.as_ref(), &settings) {
            AccessDecision::Deny {
                reason: DenyReason::NotUploaded,
            } => return Err(ContentError::NotUploaded),
            AccessDecision::Deny {
                reason: DenyReason::InsufficientCredits,
            } => {
                let required =
                    lgk_entitlement::effective_price(record.as_ref(), content_type, &settings)
                        .unwrap_or(0);
                return Err(ContentError::InsufficientCredits {
                    required,
                    available: user.credits,
                });
            }
            AccessDecision::Allow { .. } => 0,
            AccessDecision::AllowAfterCharge { price } => {
                let updated = self.wallet.apply_charge(&user, price).await?;
                self.adopt_user(updated).await;
                price
            }
        };

        // An allowed request can still lack a payload (admin bypass on an
        // unauthored tier); nothing to grant then.
        let Some(payload) = record.as_ref().and_then(|r| payload_for(r, content_type)) else {
            return Err(ContentError::NotUploaded);
        };

        self.log_activity(
            "CONTENT_OPEN",
            &format!("{content_type} {}", key.chapter_id),
        )
        .await;
        info!(content_type = %content_type, key = %composite, charged, "content granted");

        Ok(ContentGrant {
            content_type,
            payload,
            charged,
        })
    }
}

/// Project the stored record onto the payload for one content type.
fn payload_for(record: &CatalogRecord, content_type: ContentType) -> Option<Value> {
    match content_type {
        ContentType::FreeNotes => record
            .free_notes_html
            .as_ref()
            .map(|html| json!({ "html": html }))
            .or_else(|| record.free_link.as_ref().map(|url| json!({ "url": url }))),
        ContentType::PremiumNotes => record
            .premium_notes_html
            .as_ref()
            .map(|html| json!({ "html": html }))
            .or_else(|| {
                record
                    .premium_link
                    .as_ref()
                    .map(|url| json!({ "url": url }))
            }),
        ContentType::UltraPdf => record
            .ultra_pdf_link
            .as_ref()
            .map(|url| json!({ "url": url })),
        ContentType::VideoLecture => {
            if !record.video_playlist.is_empty() {
                Some(json!({ "playlist": record.video_playlist }))
            } else {
                record
                    .premium_video_link
                    .as_ref()
                    .or(record.free_video_link.as_ref())
                    .map(|url| json!({ "url": url }))
            }
        }
        ContentType::McqPractice | ContentType::AiNotes => record.ai_payload.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
