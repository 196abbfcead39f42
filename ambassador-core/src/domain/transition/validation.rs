use crate::domain::model::{MemberMetadata, ProposalMetadata};
use crate::foundation::{AmbassadorError, Result, MAX_METADATA_ENTRIES, MAX_METADATA_VALUE_LENGTH};
use std::collections::BTreeMap;

pub fn validate_member_metadata(metadata: &MemberMetadata) -> Result<()> {
    require_text("display_name", &metadata.display_name)?;
    if let Some(handle) = &metadata.forum_handle {
        bounded_text("forum_handle", handle)?;
    }
    validate_extra(&metadata.extra)
}

pub fn validate_proposal(title: &str, fund_requested: u64, metadata: &ProposalMetadata) -> Result<()> {
    require_text("title", title)?;
    if fund_requested == 0 {
        return Err(AmbassadorError::build_error("metadata", "fund_requested must be positive"));
    }
    bounded_text("description", &metadata.description)?;
    validate_extra(&metadata.extra)
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AmbassadorError::build_error("metadata", format!("{field} must not be empty")));
    }
    bounded_text(field, value)
}

fn bounded_text(field: &str, value: &str) -> Result<()> {
    if value.len() > MAX_METADATA_VALUE_LENGTH {
        return Err(AmbassadorError::build_error(
            "metadata",
            format!("{field} exceeds {MAX_METADATA_VALUE_LENGTH} bytes (got {})", value.len()),
        ));
    }
    Ok(())
}

fn validate_extra(extra: &BTreeMap<String, String>) -> Result<()> {
    if extra.len() > MAX_METADATA_ENTRIES {
        return Err(AmbassadorError::build_error(
            "metadata",
            format!("too many metadata entries: {} > {MAX_METADATA_ENTRIES}", extra.len()),
        ));
    }
    for (key, value) in extra {
        bounded_text(key, key)?;
        bounded_text(key, value)?;
    }
    Ok(())
}
