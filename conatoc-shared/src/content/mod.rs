/// Content stores
///
/// Member-facing reads and writes over papers, datasets, news, chat and the
/// member directories. Every operation takes the current
/// [`Actor`](crate::auth::authorization::Actor) and asks the policy before
/// touching the database. Publishing papers and datasets lives in
/// [`crate::publish`], since it also consumes staged uploads.
///
/// # Modules
///
/// - `filter`: Free-text filtering and paging of fetched listings
/// - `library`: Paper and dataset listings and downloads
/// - `news`: News feed
/// - `chat`: Channel chat
/// - `directory`: Researcher, doctor and patient directories
/// - `overview`: Landing page counts and latest content

pub mod chat;
pub mod directory;
pub mod filter;
pub mod library;
pub mod news;
pub mod overview;

use crate::error::{PortalError, PortalResult};

/// Trims a required field, failing with `MissingField` when blank
pub(crate) fn required_text(value: &str, field: &'static str) -> PortalResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(PortalError::MissingField(field));
    }
    Ok(value.to_string())
}

/// Trims an optional field; blank becomes `None`
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        assert_eq!(required_text("  hi ", "title").unwrap(), "hi");
        assert!(matches!(
            required_text(" \n\t", "title"),
            Err(PortalError::MissingField("title"))
        ));
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text(Some(" x ".to_string())), Some("x".to_string()));
        assert_eq!(optional_text(Some("   ".to_string())), None);
        assert_eq!(optional_text(None), None);
    }
}
