use lgk_config::SystemSettings;
use lgk_schemas::{CatalogRecord, ContentType};

/// Effective price in credits for one content type of a catalog record.
///
/// `None` means the tier does not exist for this chapter (no payload was
/// ever authored or generated) — distinct from `Some(0)`, which means the
/// content exists and is free. A record-level price override wins; otherwise
/// the settings default for the content type applies.
pub fn effective_price(
    record: Option<&CatalogRecord>,
    content_type: ContentType,
    settings: &SystemSettings,
) -> Option<u32> {
    let record = record?;
    if !record.has_payload(content_type) {
        return None;
    }
    let price = match content_type {
        ContentType::FreeNotes => 0,
        ContentType::VideoLecture => record
            .video_credits_cost
            .unwrap_or_else(|| settings.default_price_for(content_type)),
        _ => record
            .price
            .unwrap_or_else(|| settings.default_price_for(content_type)),
    };
    Some(price)
}
