//! Desktop appliers - set the background by shelling out to the desktop's own tooling.
//!
//! # Resolution
//! - Only Linux is supported
//! - `XDG_CURRENT_DESKTOP` is a colon-separated list, matched case-insensitively
//! - An explicit `desktop` setting skips detection
//! - Anything unrecognised is `ApplyError::UnsupportedEnvironment`; there is no fallback target

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::domain::Artifact;
use crate::ports::{Applier, ApplyError};

const GNOME_SCHEMA: &str = "org.gnome.desktop.background";

const PLASMA_SCRIPT: &str = r#"var allDesktops = desktops();
for (var i = 0; i < allDesktops.length; i++) {
    var d = allDesktops[i];
    d.wallpaperPlugin = "org.kde.image";
    d.currentConfigGroup = Array("Wallpaper", "org.kde.image", "General");
    d.writeConfig("Image", "file://%PATH%");
}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DesktopTarget {
    Gnome,
    Plasma,
}

impl DesktopTarget {
    pub fn name(self) -> &'static str {
        match self {
            DesktopTarget::Gnome => "gnome",
            DesktopTarget::Plasma => "plasma",
        }
    }

    /// Parse a configured target name.
    pub fn parse(name: &str) -> Result<Self, ApplyError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gnome" => Ok(DesktopTarget::Gnome),
            "plasma" | "kde" => Ok(DesktopTarget::Plasma),
            other => Err(ApplyError::UnsupportedEnvironment(format!(
                "unknown desktop {other:?} (expected gnome or plasma)"
            ))),
        }
    }

    /// Detect the target from the OS name and the `XDG_CURRENT_DESKTOP` value.
    pub fn detect(os: &str, current_desktop: Option<&str>) -> Result<Self, ApplyError> {
        if os != "linux" {
            return Err(ApplyError::UnsupportedEnvironment(format!(
                "operating system {os} is not supported"
            )));
        }
        let Some(current_desktop) = current_desktop.filter(|v| !v.trim().is_empty()) else {
            return Err(ApplyError::UnsupportedEnvironment(
                "XDG_CURRENT_DESKTOP is not set".to_string(),
            ));
        };

        current_desktop
            .split(':')
            .map(|part| part.trim().to_ascii_lowercase())
            .find_map(|part| match part.as_str() {
                "gnome" | "unity" => Some(DesktopTarget::Gnome),
                "kde" => Some(DesktopTarget::Plasma),
                _ => None,
            })
            .ok_or_else(|| {
                ApplyError::UnsupportedEnvironment(format!(
                    "desktop environment {current_desktop:?} is not supported"
                ))
            })
    }

    pub fn from_env() -> Result<Self, ApplyError> {
        let current = std::env::var("XDG_CURRENT_DESKTOP").ok();
        Self::detect(std::env::consts::OS, current.as_deref())
    }

    /// Commands that make `image` the background, in execution order.
    pub fn invocations(self, image: &Path) -> Vec<Invocation> {
        let uri = format!("file://{}", image.display());
        match self {
            DesktopTarget::Gnome => vec![
                Invocation::required("gsettings", ["set", GNOME_SCHEMA, "picture-uri", uri.as_str()]),
                // only exists on GNOME 42+
                Invocation::optional("gsettings", ["set", GNOME_SCHEMA, "picture-uri-dark", uri.as_str()]),
            ],
            DesktopTarget::Plasma => {
                let script = PLASMA_SCRIPT.replace("%PATH%", &js_escape(&image.display().to_string()));
                vec![Invocation::required(
                    "qdbus",
                    ["org.kde.plasmashell", "/PlasmaShell", "evaluateScript", script.as_str()],
                )]
            }
        }
    }
}

/// Escape for a double-quoted JavaScript string literal.
fn js_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

impl fmt::Display for DesktopTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// A failing optional invocation is logged and ignored.
    pub required: bool,
}

impl Invocation {
    pub fn required<const N: usize>(program: &str, args: [&str; N]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            required: true,
        }
    }

    pub fn optional<const N: usize>(program: &str, args: [&str; N]) -> Self {
        Self {
            required: false,
            ..Self::required(program, args)
        }
    }

    /// Run to completion; a launch failure or non-zero exit is an error.
    pub async fn run(&self) -> Result<(), ApplyError> {
        debug!(program = %self.program, args = ?self.args, "running applier command");
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ApplyError::Launch {
                program: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!(program = %self.program, stdout = %stdout.trim(), "command output");
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(ApplyError::Exit {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr,
            });
        }
        if !stderr.is_empty() {
            debug!(program = %self.program, stderr = %stderr, "command stderr");
        }
        Ok(())
    }
}

/// Applier that runs the target's invocations against the artifact's on-disk path.
pub struct CommandApplier {
    target: DesktopTarget,
    cache_dir: PathBuf,
}

impl CommandApplier {
    pub fn new(target: DesktopTarget, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            target,
            cache_dir: cache_dir.into(),
        }
    }

    pub fn desktop(&self) -> DesktopTarget {
        self.target
    }
}

#[async_trait]
impl Applier for CommandApplier {
    fn target(&self) -> &str {
        self.target.name()
    }

    async fn apply(&self, artifact: &Artifact) -> Result<(), ApplyError> {
        let image = artifact.local_path(&self.cache_dir);
        for invocation in self.target.invocations(&image) {
            match invocation.run().await {
                Ok(()) => {}
                Err(e) if !invocation.required => {
                    warn!(desktop = %self.target, error = %e, "optional applier command failed");
                }
                Err(e) => return Err(e),
            }
        }
        info!(desktop = %self.target, path = %image.display(), title = %artifact.title, "background applied");
        Ok(())
    }
}

/// Pick the applier: an explicit `desktop` name wins over environment detection.
pub fn resolve_applier(
    desktop: Option<&str>,
    cache_dir: impl Into<PathBuf>,
) -> Result<CommandApplier, ApplyError> {
    let target = match desktop.filter(|d| !d.trim().is_empty()) {
        Some(name) => DesktopTarget::parse(name)?,
        None => DesktopTarget::from_env()?,
    };
    info!(desktop = %target, "resolved desktop target");
    Ok(CommandApplier::new(target, cache_dir))
}
