use bytes::Bytes;
use uuid::Uuid;

use crate::mime;

/// A file selected for upload that is not yet durably stored.
///
/// Created on selection, annotated by validation, rewritten by HEIC conversion
/// and dropped once the orchestration outcome is recorded.
#[derive(Clone, Debug)]
pub struct UploadCandidate {
    /// Client-generated temporary identifier
    pub id: Uuid,
    /// Declared file name
    pub name: String,
    /// Declared content type (MIME)
    pub content_type: String,
    /// Binary content
    pub data: Bytes,
}

impl UploadCandidate {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Lower-cased extension without the dot.
    pub fn extension(&self) -> Option<String> {
        mime::extension_of(&self.name)
    }

    pub fn is_heic(&self) -> bool {
        mime::is_heic(&self.name, &self.content_type)
    }
}
