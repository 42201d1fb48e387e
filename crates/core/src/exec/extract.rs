//! Executable-section extraction.
//!
//! Kernels arrive as relocatable object files produced by the incore
//! compiler; only the raw instruction bytes of the executable section are
//! loaded. Parsing is delegated to the `object` crate; this module is the
//! thin collaborator surface the rest of the runtime consumes, not a
//! general object-format reader.

use object::{File, Object, ObjectSection, SectionKind};

use crate::common::{Result, RuntimeError};

/// Returns the raw bytes of the first executable section of an object file.
///
/// Fails with [`RuntimeError::Load`] if the bytes do not parse as an object
/// file, and with [`RuntimeError::NoCodeSection`] if no non-empty
/// executable section is present.
pub fn extract_code_section(object_bytes: &[u8]) -> Result<Vec<u8>> {
    let file = File::parse(object_bytes)
        .map_err(|e| RuntimeError::Load(format!("object parse: {e}")))?;

    for section in file.sections() {
        if section.kind() != SectionKind::Text {
            continue;
        }
        let data = section
            .data()
            .map_err(|e| RuntimeError::Load(format!("section data: {e}")))?;
        if !data.is_empty() {
            tracing::debug!(
                section = section.name().unwrap_or("<unnamed>"),
                len = data.len(),
                "extracted code section"
            );
            return Ok(data.to_vec());
        }
    }

    Err(RuntimeError::NoCodeSection)
}
