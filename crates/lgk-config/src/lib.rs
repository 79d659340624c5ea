//! lgk-config
//!
//! Process-wide system settings: pricing defaults, reward table, spin limits,
//! purchase options, feature flags.
//!
//! Lifecycle: decoded once at startup from the local cache, then continuously
//! replaced by realtime reconciliation whenever the remote store pushes a new
//! snapshot. There is no schema migration — a partial or stale JSON object
//! decodes to defaults for whatever it omits, never to a rejection.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use lgk_schemas::{ContentType, CreditPackage, SubscriptionPlan};

// ---------------------------------------------------------------------------
// SystemSettings
// ---------------------------------------------------------------------------

/// Total field list of the settings snapshot. Every field has a hard-coded
/// default; absence in the stored JSON falls back to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemSettings {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default)]
    pub maintenance_mode: bool,
    #[serde(default = "default_maintenance_message")]
    pub maintenance_message: String,

    // Pricing defaults (credits), used when a catalog record carries no
    // price override.
    #[serde(default = "default_premium_notes_price")]
    pub premium_notes_price: u32,
    #[serde(default = "default_ultra_pdf_price")]
    pub ultra_pdf_price: u32,
    #[serde(default = "default_video_price")]
    pub video_price: u32,

    // Reward table.
    #[serde(default = "default_daily_reward")]
    pub daily_reward: u32,
    #[serde(default = "default_signup_bonus")]
    pub signup_bonus: u32,

    // Spin wheel.
    #[serde(default = "default_wheel_rewards")]
    pub wheel_rewards: Vec<u32>,
    #[serde(default)]
    pub spin_cost: u32,
    #[serde(default = "default_spin_limit_free")]
    pub spin_limit_free: u32,
    #[serde(default = "default_spin_limit_basic")]
    pub spin_limit_basic: u32,
    #[serde(default = "default_spin_limit_ultra")]
    pub spin_limit_ultra: u32,

    // Feature flags.
    #[serde(default = "default_true")]
    pub is_game_enabled: bool,
    #[serde(default = "default_true")]
    pub allow_signup: bool,

    #[serde(default = "default_allowed_classes")]
    pub allowed_classes: Vec<String>,

    // Purchase options handed to the payment collaborator.
    #[serde(default = "default_packages")]
    pub packages: Vec<CreditPackage>,
    #[serde(default)]
    pub subscription_plans: Vec<SubscriptionPlan>,
    /// Contact the payment deep link targets.
    #[serde(default)]
    pub payment_contact: String,

    /// Unrecognized settings keys survive a round trip untouched.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            maintenance_mode: false,
            maintenance_message: default_maintenance_message(),
            premium_notes_price: default_premium_notes_price(),
            ultra_pdf_price: default_ultra_pdf_price(),
            video_price: default_video_price(),
            daily_reward: default_daily_reward(),
            signup_bonus: default_signup_bonus(),
            wheel_rewards: default_wheel_rewards(),
            spin_cost: 0,
            spin_limit_free: default_spin_limit_free(),
            spin_limit_basic: default_spin_limit_basic(),
            spin_limit_ultra: default_spin_limit_ultra(),
            is_game_enabled: true,
            allow_signup: true,
            allowed_classes: default_allowed_classes(),
            packages: default_packages(),
            subscription_plans: Vec::new(),
            payment_contact: String::new(),
            extensions: BTreeMap::new(),
        }
    }
}

impl SystemSettings {
    /// Default price in credits for a content type, used when the catalog
    /// record does not override it. Free and generated content default to 0.
    pub fn default_price_for(&self, content_type: ContentType) -> u32 {
        match content_type {
            ContentType::FreeNotes => 0,
            ContentType::PremiumNotes => self.premium_notes_price,
            ContentType::UltraPdf => self.ultra_pdf_price,
            ContentType::VideoLecture => self.video_price,
            ContentType::McqPractice | ContentType::AiNotes => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Decode / hash
// ---------------------------------------------------------------------------

/// Decode a stored settings snapshot defensively.
///
/// Any JSON object decodes (missing fields become defaults); a value that is
/// not an object at all — or `None` — yields the full default settings. A
/// version mismatch is handled by field-presence fallback, never by
/// rejecting the whole record.
pub fn decode_settings(raw: Option<Value>) -> SystemSettings {
    match raw {
        Some(v) if v.is_object() => {
            serde_json::from_value(v).unwrap_or_else(|_| SystemSettings::default())
        }
        _ => SystemSettings::default(),
    }
}

/// Canonical-JSON SHA-256 of a settings snapshot.
///
/// Used for cheap structural change detection by realtime reconciliation:
/// two snapshots with the same hash need no merge.
pub fn settings_hash(settings: &SystemSettings) -> Result<String> {
    let canonical =
        serde_json::to_string(settings).context("canonical settings serialize failed")?;
    Ok(sha256_hex(canonical.as_bytes()))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Field defaults
// ---------------------------------------------------------------------------

fn default_app_name() -> String {
    "LearnGate".to_string()
}

fn default_maintenance_message() -> String {
    "We are upgrading our servers. Please check back later.".to_string()
}

fn default_premium_notes_price() -> u32 {
    5
}

fn default_ultra_pdf_price() -> u32 {
    10
}

fn default_video_price() -> u32 {
    5
}

fn default_daily_reward() -> u32 {
    3
}

fn default_signup_bonus() -> u32 {
    2
}

fn default_wheel_rewards() -> Vec<u32> {
    vec![0, 1, 2, 5]
}

fn default_spin_limit_free() -> u32 {
    2
}

fn default_spin_limit_basic() -> u32 {
    5
}

fn default_spin_limit_ultra() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

fn default_allowed_classes() -> Vec<String> {
    ["6", "7", "8", "9", "10", "11", "12"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_packages() -> Vec<CreditPackage> {
    let table: [(&str, &str, u32, u32); 4] = [
        ("pkg-1", "Starter Pack", 100, 150),
        ("pkg-2", "Value Pack", 200, 350),
        ("pkg-3", "Pro Pack", 500, 1500),
        ("pkg-4", "Ultra Pack", 1000, 3000),
    ];
    table
        .iter()
        .map(|(id, name, price, credits)| CreditPackage {
            id: id.to_string(),
            name: name.to_string(),
            price: *price,
            credits: *credits,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
