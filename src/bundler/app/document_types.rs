//! Document types (UTIs) an app registers itself to open.

use crate::bundler::{
    command::{CommandRunner, ToolCommand},
    error::Result,
};

/// LaunchServices registration dump tool.
const LSREGISTER: &str = "/System/Library/Frameworks/CoreServices.framework/Frameworks/LaunchServices.framework/Versions/A/Support/lsregister";

/// `LSHandlerRank` of a document type.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum HandlerRank {
    Owner,
    Default,
    #[default]
    Alternate,
    None,
}

impl HandlerRank {
    /// Info.plist value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "Owner",
            Self::Default => "Default",
            Self::Alternate => "Alternate",
            Self::None => "None",
        }
    }
}

/// `CFBundleTypeRole` of a document type.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum BundleTypeRole {
    Editor,
    #[default]
    Viewer,
    Shell,
    QLGenerator,
    None,
}

impl BundleTypeRole {
    /// Info.plist value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Editor => "Editor",
            Self::Viewer => "Viewer",
            Self::Shell => "Shell",
            Self::QLGenerator => "QLGenerator",
            Self::None => "None",
        }
    }
}

/// A uniform type identifier the app can open, e.g. `public.json`.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct DocumentType {
    /// Uniform type identifier.
    pub uti: String,
    /// How strongly the app claims the type.
    #[serde(default)]
    pub rank: HandlerRank,
    /// What the app does with the type.
    #[serde(default)]
    pub role: BundleTypeRole,
}

impl DocumentType {
    /// Document type with default rank (`Alternate`) and role (`Viewer`).
    pub fn new(uti: impl Into<String>) -> Self {
        Self {
            uti: uti.into(),
            rank: HandlerRank::default(),
            role: BundleTypeRole::default(),
        }
    }

    /// File extension implied by the UTI's last component.
    pub fn extension(&self) -> &str {
        self.uti.rsplit('.').next().unwrap_or(&self.uti)
    }

    /// `CFBundleDocumentTypes` entry.
    pub fn to_plist(&self) -> plist::Value {
        let mut entry = plist::Dictionary::new();
        entry.insert("CFBundleTypeName".into(), self.uti.clone().into());
        entry.insert("CFBundleTypeRole".into(), self.role.as_str().into());
        entry.insert("LSHandlerRank".into(), self.rank.as_str().into());
        entry.insert(
            "LSItemContentTypes".into(),
            plist::Value::Array(vec![self.uti.clone().into()]),
        );
        entry.insert(
            "CFBundleTypeExtensions".into(),
            plist::Value::Array(vec![self.extension().into()]),
        );
        plist::Value::Dictionary(entry)
    }
}

/// Extracts the registered UTIs containing `search` from an `lsregister -dump`.
pub fn parse_utis(dump: &str, search: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for line in dump.lines() {
        if !line.starts_with("uti") {
            continue;
        }
        let Some(uti) = line.split(':').nth(1).map(str::trim) else {
            continue;
        };
        if uti.contains(search) && !found.iter().any(|f| f == uti) {
            log::debug!("found possible uti for '{}': '{}'", search, uti);
            found.push(uti.to_string());
        }
    }
    found
}

/// Searches this machine's LaunchServices database for UTIs containing `search`.
pub async fn find_local_utis<R: CommandRunner>(runner: &R, search: &str) -> Result<Vec<String>> {
    log::info!("searching for '{}'", search);
    let output = runner
        .run(&ToolCommand::new(LSREGISTER).arg("-dump"))
        .await?
        .check()?;
    let found = parse_utis(&output.stdout, search);
    log::info!("found {} possible utis", found.len());
    Ok(found)
}
