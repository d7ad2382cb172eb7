//! Saved loader configuration.
//!
//! A snapshot records the options a loader was opened with and the flat schema it
//! saw, so a host can persist a data source and later reopen it with the same
//! settings, refusing files whose schema changed in between.
//!
//! Layout: `b"PQLS"`, a little-endian `u16` format version, then a `postcard` body.

use crate::error::{LoaderError, Result};
use crate::options::LoaderOptions;
use crate::types::SemanticType;
use serde::{Deserialize, Serialize};

const MAGIC: &[u8; 4] = b"PQLS";
const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = MAGIC.len() + 2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderSnapshot {
    pub options: LoaderOptions,
    /// Flat schema as `(column name, semantic type)`, in column order.
    pub fields: Vec<(String, SemanticType)>,
}

impl LoaderSnapshot {
    /// Encode to the versioned binary layout.
    ///
    /// # Errors
    /// [`LoaderError::Snapshot`] if the body cannot be encoded.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body = postcard::to_allocvec(self)
            .map_err(|e| LoaderError::Snapshot(format!("encode: {e}")))?;
        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode bytes produced by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    /// [`LoaderError::Snapshot`] for a bad header, an unknown version, or a
    /// malformed body.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
            return Err(LoaderError::Snapshot("missing snapshot header".into()));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FORMAT_VERSION {
            return Err(LoaderError::Snapshot(format!(
                "unsupported format version {version}, expected {FORMAT_VERSION}"
            )));
        }
        let snapshot: Self = postcard::from_bytes(&bytes[HEADER_LEN..])
            .map_err(|e| LoaderError::Snapshot(format!("decode: {e}")))?;
        snapshot.options.validate()?;
        Ok(snapshot)
    }

    /// Describe the first difference between the saved schema and `fields`.
    pub(crate) fn schema_difference(&self, fields: &[(String, SemanticType)]) -> Option<String> {
        if self.fields.len() != fields.len() {
            return Some(format!(
                "saved schema has {} columns, file has {}",
                self.fields.len(),
                fields.len()
            ));
        }
        self.fields
            .iter()
            .zip(fields)
            .enumerate()
            .find(|(_, (saved, found))| saved != found)
            .map(|(i, ((saved_name, saved_ty), (name, ty)))| {
                format!("column {i}: saved '{saved_name}' ({saved_ty}), file has '{name}' ({ty})")
            })
    }
}
