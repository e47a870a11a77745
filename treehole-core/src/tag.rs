// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of characters of a tag name.
pub const MAX_TAG_NAME_LENGTH: usize = 32;

/// Label shared by all content, unique by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,

    pub name: String,

    /// Popularity score, raised by content flows whenever the tag gets used.
    pub temperature: i64,
}

/// Checks a tag name before it gets stored.
pub fn validate_tag_name(name: &str) -> Result<(), TagNameError> {
    if name.trim().is_empty() {
        return Err(TagNameError::Empty);
    }

    let length = name.chars().count();
    if length > MAX_TAG_NAME_LENGTH {
        return Err(TagNameError::TooLong(length, MAX_TAG_NAME_LENGTH));
    }

    Ok(())
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagNameError {
    #[error("tag name can not be empty")]
    Empty,

    #[error("tag name has {0} characters, maximum is {1}")]
    TooLong(usize, usize),
}

#[cfg(test)]
mod tests {
    use super::{TagNameError, validate_tag_name};

    #[test]
    fn tag_names() {
        assert!(validate_tag_name("rust").is_ok());
        assert!(validate_tag_name("树洞").is_ok());
        assert_eq!(validate_tag_name("  "), Err(TagNameError::Empty));
        assert_eq!(
            validate_tag_name(&"x".repeat(33)),
            Err(TagNameError::TooLong(33, 32))
        );
        // Length is counted in characters, not bytes.
        assert!(validate_tag_name(&"树".repeat(32)).is_ok());
    }
}
