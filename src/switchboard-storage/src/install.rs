//! Identifier generated once per install.
//!
//! Lets a configuration be assigned before the person has an account or
//! tracking id.

use std::path::Path;

use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::medium::write_atomic;

/// Read the install id at `path`, generating and persisting one if needed.
pub fn load_or_create_install_id(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(content) if !content.trim().is_empty() => return Ok(content.trim().to_string()),
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }

    let id = Uuid::new_v4().to_string();
    write_atomic(path, id.as_bytes())?;
    info!(install_id = %id, "Generated install id");
    Ok(id)
}
