//! Files held in the MAAS file store.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use maas_core::{check_fields, ApiVersion, Checker, Error, FieldMap, Readers, Resource, Result};
use serde_json::Value;

/// A stored file.
///
/// List responses carry metadata only; fetching a single file also returns
/// its base64 encoded content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// Canonical API path.
    pub resource_uri: String,
    /// File name, unique per owner.
    pub filename: String,
    /// Path that downloads the file without authentication.
    pub anon_uri: String,
    /// Base64 encoded content, when the response included it.
    pub content: Option<String>,
}

impl File {
    /// Decodes the inline content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotValid`] when the file was read without content and
    /// [`Error::Deserialization`] when the content is not valid base64.
    pub fn decoded_content(&self) -> Result<Vec<u8>> {
        let content = self.content.as_deref().ok_or_else(|| {
            Error::NotValid(format!("file {:?} has no inline content", self.filename))
        })?;
        STANDARD
            .decode(content)
            .map_err(|err| Error::deserialization(format!("file {:?} content", self.filename), err))
    }
}

pub(crate) static FILES: Readers<File> = Readers::new("file", &[(ApiVersion::V2_0, file_2_0)]);

impl Resource for File {
    fn readers() -> &'static Readers<Self> {
        &FILES
    }
}

fn file_2_0(_version: ApiVersion, source: &Value) -> Result<File> {
    let fields = FieldMap::new()
        .required("resource_uri", Checker::String)
        .required("filename", Checker::String)
        .required("anon_resource_uri", Checker::String)
        .optional("content", Checker::nullable(Checker::String));
    let record = check_fields(&fields, source, "file 2.0 schema check failed")?;

    Ok(File {
        resource_uri: record.string("resource_uri")?,
        filename: record.string("filename")?,
        anon_uri: record.string("anon_resource_uri")?,
        content: record.opt_string("content")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn file_json() -> Value {
        json!({
            "resource_uri": "/MAAS/api/2.0/files/test/",
            "filename": "test",
            "anon_resource_uri": "/MAAS/api/2.0/files/?op=get_by_key&key=3afba564-fb7d-11e5-932f-52540051bf22"
        })
    }

    #[test]
    fn listing_has_no_content() {
        let files = File::read_list(ApiVersion::V2_0, &json!([file_json()])).unwrap();
        assert_eq!(files[0].filename, "test");
        assert!(files[0].content.is_none());
        assert!(matches!(files[0].decoded_content(), Err(Error::NotValid(_))));
    }

    #[test]
    fn inline_content_is_decoded() {
        let mut source = file_json();
        source["content"] = json!("dGhpcyBpcyBhIHRlc3QK");
        let file = File::read(ApiVersion::V2_0, &source).unwrap();
        assert_eq!(file.decoded_content().unwrap(), b"this is a test\n".to_vec());
    }

    #[test]
    fn garbage_content_is_a_deserialization_error() {
        let mut source = file_json();
        source["content"] = json!("not base64!");
        let file = File::read(ApiVersion::V2_0, &source).unwrap();
        assert!(matches!(file.decoded_content(), Err(Error::Deserialization(_))));
    }
}
