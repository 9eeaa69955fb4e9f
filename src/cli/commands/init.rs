//! `init`: project scaffolding.

use crate::bundler::{
    app::entitlements::MINIMUM_ENTITLEMENTS, command::set_executable, error::ErrorExt,
    spec::validate,
};
use crate::cli::RuntimeConfig;
use crate::error::{BundlerError, CliError, Result};
use crate::metadata::MANIFEST_FILE;
use handlebars::Handlebars;
use std::path::{Path, PathBuf};

const MANIFEST_TEMPLATE: &str = r#"[app]
name = "{{name}}"
identifier = "{{identifier}}"
entry = "app/app.py"
entitlements = "entitlements.plist"
architecture = "universal2"
log_level = "WARN"

[package]
version = "0.1.0"
identifier = "{{identifier}}.pkg"
preinstall = "scripts/preinstall"
postinstall = "scripts/postinstall"

[paths]
dist = "dist"
build = "build"

[notary]
# apple_id = "you@example.com"
# team_id = "ABCDE12345"
# The app-specific password is read from APPLE_APP_SPECIFIC_PASSWORD.
"#;

const APP_TEMPLATE: &str = r#"def main():
    print("Hello from {{name}}")


if __name__ == "__main__":
    main()
"#;

const PREINSTALL_TEMPLATE: &str = "#!/bin/bash\nexit 0\n";

const POSTINSTALL_TEMPLATE: &str = r#"#!/bin/bash
APP_NAME="{{name}}"
chmod -R a+rX /Applications/"$APP_NAME".app
exit 0
"#;

/// Files written by [`scaffold`], relative to the project directory.
const FILES: &[(&str, &str, bool)] = &[
    (MANIFEST_FILE, MANIFEST_TEMPLATE, false),
    ("app/app.py", APP_TEMPLATE, false),
    ("entitlements.plist", MINIMUM_ENTITLEMENTS, false),
    ("scripts/preinstall", PREINSTALL_TEMPLATE, true),
    ("scripts/postinstall", POSTINSTALL_TEMPLATE, true),
];

/// Writes a starter project into `dir` and returns the files it created.
///
/// Existing files are kept unless `force` is set. `dist/` and `build/` are
/// created empty.
pub async fn scaffold(dir: &Path, name: &str, identifier: &str, force: bool) -> Result<Vec<PathBuf>> {
    if !validate::app_name(name) {
        return Err(invalid(format!(
            "app name '{}' must be letters, digits and spaces, at most {} characters",
            name,
            validate::APP_NAME_MAX_LEN
        )));
    }
    if !validate::identifier(identifier) {
        return Err(invalid(format!(
            "identifier '{}' must be letters, digits, '.' and '-', at most {} characters",
            identifier,
            validate::IDENTIFIER_MAX_LEN
        )));
    }

    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    let data = serde_json::json!({ "name": name, "identifier": identifier });

    for sub in ["dist", "build", "app", "scripts"] {
        let path = dir.join(sub);
        tokio::fs::create_dir_all(&path)
            .await
            .fs_context("creating project directory", &path)?;
    }

    let mut created = Vec::new();
    for (relative, template, executable) in FILES {
        let path = dir.join(relative);
        if path.exists() && !force {
            log::info!("{} exists; leaving it alone", path.display());
            continue;
        }
        let contents = handlebars.render_template(template, &data)?;
        tokio::fs::write(&path, contents)
            .await
            .fs_context("writing scaffold file", &path)?;
        if *executable {
            set_executable(&path).await?;
        }
        created.push(path);
    }

    Ok(created)
}

fn invalid(reason: String) -> BundlerError {
    BundlerError::Cli(CliError::InvalidArguments { reason })
}

/// Runs `init`.
pub async fn execute(
    dir: &Path,
    name: &str,
    identifier: &str,
    force: bool,
    config: &RuntimeConfig,
) -> Result<i32> {
    config.progress(&format!("Scaffolding {} in {}", name, dir.display()))?;
    let created = scaffold(dir, name, identifier, force).await?;
    for path in &created {
        config.indent(&path.display().to_string())?;
    }
    config.success(&format!(
        "Created {} file(s); edit {} and run `release`",
        created.len(),
        dir.join(MANIFEST_FILE).display()
    ))?;
    Ok(0)
}
