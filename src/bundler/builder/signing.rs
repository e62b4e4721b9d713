//! Signing identity setup.
//!
//! A Developer ID is written either as `Name` or `Name (TEAMID)`; the full
//! codesign identity is `Developer ID Application: <dev_id>`. An empty ID or
//! `-` selects ad-hoc signing.

use crate::bundler::{Error, Result};
use regex::Regex;

/// Prefix of every Developer ID signing identity.
pub const DEVELOPER_ID_PREFIX: &str = "Developer ID Application: ";

/// Name, optionally followed by a 10 character team id in parentheses.
const DEVELOPER_ID_PATTERN: &str =
    r"^[A-Za-z][A-Za-z0-9\s\.\-\,\']+(?:\s+\([A-Z0-9]{10}\))?$";

/// Checks the format of a Developer ID.
///
/// # Errors
///
/// Returns [`Error::ValidationError`] when the ID is empty, shorter than 2 or
/// longer than 100 characters, or does not match `Name (TEAMID)`.
pub fn validate_developer_id(dev_id: &str) -> Result<()> {
    let dev_id = dev_id.trim();
    if dev_id.is_empty() {
        return Err(Error::ValidationError("Developer ID cannot be empty".into()));
    }

    let len = dev_id.chars().count();
    if len < 2 {
        return Err(Error::ValidationError(format!(
            "Developer ID is too short: '{dev_id}'"
        )));
    }
    if len > 100 {
        return Err(Error::ValidationError(format!(
            "Developer ID is too long (max 100 characters): '{dev_id}'"
        )));
    }

    let pattern = Regex::new(DEVELOPER_ID_PATTERN)
        .map_err(|e| Error::GenericError(format!("invalid Developer ID pattern: {e}")))?;
    if !pattern.is_match(dev_id) {
        return Err(Error::ValidationError(format!(
            "Developer ID has invalid format: '{dev_id}'. \
             Expected format: 'Name' or 'Name (TEAM_ID)' where TEAM_ID is 10 alphanumeric characters"
        )));
    }
    Ok(())
}

/// Normalizes a configured Developer ID. `-` and blank mean ad-hoc (`None`).
pub fn developer_id(dev_id: Option<&str>) -> Result<Option<String>> {
    match dev_id.map(str::trim) {
        None | Some("") | Some("-") => Ok(None),
        Some(id) => {
            validate_developer_id(id)?;
            Ok(Some(id.to_string()))
        }
    }
}

/// Full codesign identity for a Developer ID, `None` for ad-hoc signing.
pub fn signing_authority(dev_id: Option<&str>) -> Result<Option<String>> {
    Ok(developer_id(dev_id)?.map(|id| format!("{DEVELOPER_ID_PREFIX}{id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_name_and_team_id_forms() {
        validate_developer_id("John Doe").unwrap();
        validate_developer_id("John Doe (ABCD123456)").unwrap();
        validate_developer_id("Acme, Inc.").unwrap();
        validate_developer_id("O'Brien-Smith Ltd").unwrap();
    }

    #[test]
    fn rejects_bad_ids() {
        for bad in ["", "   ", "J", "1Password", "John Doe (abc)", "John Doe (ABCD12345)"] {
            let err = validate_developer_id(bad).unwrap_err();
            assert!(matches!(err, Error::ValidationError(_)), "{bad:?} was accepted");
        }
        let long = format!("A{}", "b".repeat(100));
        assert!(validate_developer_id(&long).is_err());
    }

    #[test]
    fn dash_and_blank_mean_adhoc() {
        assert_eq!(signing_authority(None).unwrap(), None);
        assert_eq!(signing_authority(Some("-")).unwrap(), None);
        assert_eq!(signing_authority(Some("")).unwrap(), None);
        assert_eq!(
            signing_authority(Some("John Doe (ABCD123456)")).unwrap().as_deref(),
            Some("Developer ID Application: John Doe (ABCD123456)")
        );
        assert!(signing_authority(Some("!!")).is_err());
    }
}
