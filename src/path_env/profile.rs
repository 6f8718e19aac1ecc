//! Shell profile PATH storage (Linux, macOS).
//!
//! The persistent PATH is what the profile appends through
//! `export PATH=...` lines. New entries get one appended line; existing
//! content is never rewritten.

use super::{add_to_process_path, on_process_path, PathRegistrar, PathUpdateError, Registration};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Characters that would break out of a double-quoted shell assignment
/// or split the entry in two
const FORBIDDEN: &[char] = &['"', ':', '\n', '$', '`', '\\'];

/// Appends PATH entries to a shell startup file
#[derive(Debug, Clone)]
pub struct ShellProfileRegistrar {
    profile: PathBuf,
}

impl ShellProfileRegistrar {
    pub fn new(profile: PathBuf) -> Self {
        Self { profile }
    }

    /// `~/.zshrc` when it exists, otherwise `~/.bashrc`
    pub fn for_current_user() -> Result<Self, PathUpdateError> {
        let home = dirs::home_dir().ok_or(PathUpdateError::NoHome)?;
        Ok(Self::new(select_profile(&home)))
    }

    /// Entries the profile currently adds to PATH
    pub fn entries(&self) -> Result<Vec<String>, PathUpdateError> {
        Ok(exported_entries(&self.read_profile()?))
    }

    fn read_profile(&self) -> Result<String, PathUpdateError> {
        match std::fs::read_to_string(&self.profile) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(PathUpdateError::Read {
                location: self.location(),
                source,
            }),
        }
    }
}

impl PathRegistrar for ShellProfileRegistrar {
    fn register(&self, directory: &Path) -> Result<Registration, PathUpdateError> {
        let entry = directory.to_str().ok_or_else(|| PathUpdateError::Unsupported {
            path: directory.to_path_buf(),
            reason: "path is not valid UTF-8",
        })?;
        if entry.contains(FORBIDDEN) {
            return Err(PathUpdateError::Unsupported {
                path: directory.to_path_buf(),
                reason: "path contains a character that cannot be quoted in a shell profile",
            });
        }

        let content = self.read_profile()?;
        if exported_entries(&content).iter().any(|e| e == entry) {
            info!("{} already on PATH via {}", entry, self.location());
            add_to_process_path(directory);
            return Ok(Registration::AlreadyPresent);
        }
        if on_process_path(directory) {
            info!("{} already on PATH", entry);
            return Ok(Registration::AlreadyPresent);
        }

        let mut line = String::new();
        if !content.is_empty() && !content.ends_with('\n') {
            line.push('\n');
        }
        line.push_str(&format!("export PATH=\"$PATH:{}\"\n", entry));

        let write_err = |source| PathUpdateError::Write {
            location: self.location(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.profile)
            .map_err(write_err)?;
        file.write_all(line.as_bytes()).map_err(write_err)?;

        info!("Added {} to PATH in {}", entry, self.location());
        add_to_process_path(directory);
        Ok(Registration::Added)
    }

    fn location(&self) -> String {
        self.profile.display().to_string()
    }
}

fn select_profile(home: &Path) -> PathBuf {
    let zshrc = home.join(".zshrc");
    if zshrc.exists() {
        zshrc
    } else {
        home.join(".bashrc")
    }
}

/// Directories added by `export PATH=...` / `PATH=...` lines.
/// `$PATH` and `${PATH}` references are not entries.
fn exported_entries(content: &str) -> Vec<String> {
    let mut entries = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        let Some(rest) = line
            .strip_prefix("export PATH=")
            .or_else(|| line.strip_prefix("PATH="))
        else {
            continue;
        };

        for part in assigned_value(rest).split(':') {
            if part.is_empty() || part == "$PATH" || part == "${PATH}" {
                continue;
            }
            entries.push(part.to_string());
        }
    }
    entries
}

/// The value of a shell assignment: the quoted string, or the first word
fn assigned_value(rest: &str) -> &str {
    let mut chars = rest.chars();
    match chars.next() {
        Some(quote @ ('"' | '\'')) => {
            let inner = &rest[1..];
            match inner.find(quote) {
                Some(end) => &inner[..end],
                None => inner,
            }
        }
        _ => rest.split_whitespace().next().unwrap_or(""),
    }
}
