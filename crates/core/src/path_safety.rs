//! Filename sanitization.
//!
//! The implementation this protocol is modeled on joins a client-supplied
//! filename to the working directory with no traversal check. That is
//! flagged as an open question in the spec (permissive by default); this
//! crate resolves it by rejecting any name containing a path separator or
//! a `..` component before it ever reaches the filesystem.

use std::path::{Component, Path};

use crate::error::ResourceError;

/// Validates a client-supplied filename and returns it unchanged if safe.
///
/// Rejects empty names, any name containing a path separator (`/` or, on
/// Windows targets, `\`), and any name with a `..` component. A safe name
/// is always a single path component meant to be joined directly onto the
/// working directory.
pub fn sanitize_filename(name: &str) -> Result<&str, ResourceError> {
    if name.is_empty() {
        return Err(ResourceError::InvalidName(name.to_string()));
    }

    let path = Path::new(name);
    let mut components = path.components();
    let only_component = components.next();
    if components.next().is_some() {
        return Err(ResourceError::InvalidName(name.to_string()));
    }

    match only_component {
        Some(Component::Normal(part)) if part == name => Ok(name),
        _ => Err(ResourceError::InvalidName(name.to_string())),
    }
}
