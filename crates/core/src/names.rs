//! Name validation
//!
//! ## Index names
//!
//! - Non-empty, at most 255 bytes
//! - Lower-case only
//! - No whitespace and none of `\ / * ? " < > | , #`
//! - Cannot start with `_`, `-` or `+`
//!
//! ## Type names
//!
//! - Non-empty, no `.`, cannot start with `_` (reserved for metadata blocks)
//!
//! ## Field names
//!
//! - Non-empty, no `.` (dots address sub-fields on the wire)

use crate::error::{Error, Result};

/// Maximum length of an index name in bytes
pub const MAX_INDEX_NAME_LENGTH: usize = 255;

const FORBIDDEN_INDEX_CHARS: [char; 10] = ['\\', '/', '*', '?', '"', '<', '>', '|', ',', '#'];

/// Validate an index name
pub fn validate_index_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name("index", name, "cannot be empty"));
    }
    if name.len() > MAX_INDEX_NAME_LENGTH {
        return Err(Error::invalid_name(
            "index",
            name,
            format!("too long: {} bytes (max {})", name.len(), MAX_INDEX_NAME_LENGTH),
        ));
    }
    if let Some(first) = name.chars().next() {
        if matches!(first, '_' | '-' | '+') {
            return Err(Error::invalid_name(
                "index",
                name,
                format!("cannot start with '{}'", first),
            ));
        }
    }
    for (position, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            return Err(Error::invalid_name("index", name, "must be lower-case"));
        }
        if c.is_whitespace() || FORBIDDEN_INDEX_CHARS.contains(&c) {
            return Err(Error::invalid_name(
                "index",
                name,
                format!("invalid character '{}' at position {}", c, position),
            ));
        }
    }
    Ok(())
}

/// Validate a type name
pub fn validate_type_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name("type", name, "cannot be empty"));
    }
    if name.starts_with('_') {
        return Err(Error::invalid_name("type", name, "cannot start with '_'"));
    }
    if name.contains('.') {
        return Err(Error::invalid_name("type", name, "cannot contain '.'"));
    }
    Ok(())
}

/// Validate a field or multi-field group name
pub fn validate_field_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name("field", name, "cannot be empty"));
    }
    if name.contains('.') {
        return Err(Error::invalid_name("field", name, "cannot contain '.'"));
    }
    Ok(())
}
