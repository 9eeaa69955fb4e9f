//! Post-build Info.plist patching.
//!
//! Must run after PyInstaller has produced the bundle and before `codesign`;
//! any later change invalidates the signature.

use super::document_types::DocumentType;
use crate::bundler::error::{Error, ErrorExt, Result};
use std::path::{Path, PathBuf};

/// Keys added to a freshly built bundle's Info.plist.
#[derive(Clone, Debug, Default)]
pub struct InfoPlistPatch {
    /// Custom URL scheme (`myapp` for `myapp://...`).
    pub url_scheme: Option<String>,
    /// Name registered for the URL scheme, usually the bundle identifier.
    pub url_name: Option<String>,
    /// Document types the app opens.
    pub document_types: Vec<DocumentType>,
}

impl InfoPlistPatch {
    /// Whether applying the patch would change anything.
    pub fn is_empty(&self) -> bool {
        self.url_scheme.is_none() && self.document_types.is_empty()
    }

    fn apply_to(&self, dict: &mut plist::Dictionary) {
        if let Some(scheme) = &self.url_scheme {
            let mut url_type = plist::Dictionary::new();
            if let Some(name) = &self.url_name {
                url_type.insert("CFBundleURLName".into(), name.clone().into());
            }
            url_type.insert(
                "CFBundleURLSchemes".into(),
                plist::Value::Array(vec![scheme.clone().into()]),
            );
            dict.insert(
                "CFBundleURLTypes".into(),
                plist::Value::Array(vec![plist::Value::Dictionary(url_type)]),
            );
        }

        if !self.document_types.is_empty() {
            let types = self.document_types.iter().map(DocumentType::to_plist).collect();
            dict.insert("CFBundleDocumentTypes".into(), plist::Value::Array(types));
        }
    }
}

/// Path of the Info.plist inside an `.app` bundle.
pub fn info_plist_path(bundle: &Path) -> PathBuf {
    bundle.join("Contents").join("Info.plist")
}

/// Loads the bundle's Info.plist, applies `patch`, and rewrites it as XML.
pub async fn patch_info_plist(bundle: &Path, patch: &InfoPlistPatch) -> Result<()> {
    if patch.is_empty() {
        return Ok(());
    }

    let path = info_plist_path(bundle);
    let patch = patch.clone();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut value = plist::Value::from_file(&path)?;
        let dict = value.as_dictionary_mut().ok_or_else(|| {
            Error::GenericError(format!("{} is not a dictionary plist", path.display()))
        })?;
        patch.apply_to(dict);

        std::fs::remove_file(&path).fs_context("removing stale Info.plist", &path)?;
        value.to_file_xml(&path)?;
        log::debug!("patched {}", path.display());
        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("Info.plist patch task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::app::document_types::HandlerRank;

    fn bundle_with_plist() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("Demo.app");
        std::fs::create_dir_all(bundle.join("Contents")).unwrap();
        let mut dict = plist::Dictionary::new();
        dict.insert("CFBundleName".into(), "Demo".into());
        plist::Value::Dictionary(dict)
            .to_file_xml(info_plist_path(&bundle))
            .unwrap();
        dir
    }

    #[tokio::test]
    async fn adds_url_scheme_and_document_types() {
        let dir = bundle_with_plist();
        let bundle = dir.path().join("Demo.app");
        let mut doc = DocumentType::new("public.json");
        doc.rank = HandlerRank::Default;
        let patch = InfoPlistPatch {
            url_scheme: Some("demo".into()),
            url_name: Some("com.example.demo".into()),
            document_types: vec![doc],
        };

        patch_info_plist(&bundle, &patch).await.unwrap();

        let value = plist::Value::from_file(info_plist_path(&bundle)).unwrap();
        let dict = value.as_dictionary().unwrap();
        assert_eq!(dict.get("CFBundleName").unwrap().as_string(), Some("Demo"));

        let url_types = dict.get("CFBundleURLTypes").unwrap().as_array().unwrap();
        let url = url_types[0].as_dictionary().unwrap();
        assert_eq!(url.get("CFBundleURLName").unwrap().as_string(), Some("com.example.demo"));
        assert_eq!(
            url.get("CFBundleURLSchemes").unwrap().as_array().unwrap()[0].as_string(),
            Some("demo")
        );

        let docs = dict.get("CFBundleDocumentTypes").unwrap().as_array().unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn empty_patch_does_not_touch_file() {
        let dir = tempfile::tempdir().unwrap();
        // no Info.plist exists: an empty patch must not even look for it
        patch_info_plist(&dir.path().join("Missing.app"), &InfoPlistPatch::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_plist_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let patch = InfoPlistPatch {
            url_scheme: Some("demo".into()),
            ..Default::default()
        };
        assert!(patch_info_plist(&dir.path().join("Missing.app"), &patch).await.is_err());
    }
}
