//! Registry PATH storage (Windows).

use super::{add_to_process_path, append_entry, contains_entry, PathRegistrar, PathUpdateError, Registration};
use std::path::Path;
use tracing::info;
use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_READ, KEY_WRITE, REG_EXPAND_SZ};
use winreg::{RegKey, RegValue};

const USER_ENVIRONMENT: &str = "Environment";
const MACHINE_ENVIRONMENT: &str = r"SYSTEM\CurrentControlSet\Control\Session Manager\Environment";
const PATH_VALUE: &str = "Path";

/// Which environment block to update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryScope {
    /// `HKCU\Environment`
    User,
    /// System-wide environment; needs administrator rights
    Machine,
}

/// Appends PATH entries to the `Path` registry value
#[derive(Debug, Clone)]
pub struct RegistryRegistrar {
    scope: RegistryScope,
}

impl RegistryRegistrar {
    pub fn new(scope: RegistryScope) -> Self {
        Self { scope }
    }

    fn open_key(&self) -> std::io::Result<RegKey> {
        let (root, subkey) = match self.scope {
            RegistryScope::User => (HKEY_CURRENT_USER, USER_ENVIRONMENT),
            RegistryScope::Machine => (HKEY_LOCAL_MACHINE, MACHINE_ENVIRONMENT),
        };
        RegKey::predef(root).open_subkey_with_flags(subkey, KEY_READ | KEY_WRITE)
    }
}

impl PathRegistrar for RegistryRegistrar {
    fn register(&self, directory: &Path) -> Result<Registration, PathUpdateError> {
        let entry = directory.to_str().ok_or_else(|| PathUpdateError::Unsupported {
            path: directory.to_path_buf(),
            reason: "path is not valid Unicode",
        })?;
        if entry.contains(';') {
            return Err(PathUpdateError::Unsupported {
                path: directory.to_path_buf(),
                reason: "path contains the ';' separator",
            });
        }

        let key = self.open_key().map_err(|source| PathUpdateError::Read {
            location: self.location(),
            source,
        })?;

        let current: String = match key.get_value(PATH_VALUE) {
            Ok(value) => value,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(source) => {
                return Err(PathUpdateError::Read {
                    location: self.location(),
                    source,
                })
            }
        };

        if contains_entry(&current, entry, ';') {
            info!("{} already on PATH in {}", entry, self.location());
            add_to_process_path(directory);
            return Ok(Registration::AlreadyPresent);
        }

        let updated = append_entry(&current, entry, ';');
        key.set_raw_value(PATH_VALUE, &expand_sz(&updated))
            .map_err(|source| PathUpdateError::Write {
                location: self.location(),
                source,
            })?;

        info!("Added {} to PATH in {}", entry, self.location());
        add_to_process_path(directory);
        Ok(Registration::Added)
    }

    fn location(&self) -> String {
        match self.scope {
            RegistryScope::User => format!(r"HKCU\{}", USER_ENVIRONMENT),
            RegistryScope::Machine => format!(r"HKLM\{}", MACHINE_ENVIRONMENT),
        }
    }
}

/// REG_EXPAND_SZ keeps `%SystemRoot%`-style references in the value working
fn expand_sz(value: &str) -> RegValue {
    let bytes = value
        .encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(|unit| unit.to_le_bytes())
        .collect();
    RegValue {
        bytes,
        vtype: REG_EXPAND_SZ,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_sz_encoding() {
        let value = expand_sz("C:\\a");
        assert_eq!(value.vtype, REG_EXPAND_SZ);
        assert_eq!(value.bytes, vec![b'C', 0, b':', 0, b'\\', 0, b'a', 0, 0, 0]);
    }

    #[test]
    fn test_location() {
        assert_eq!(RegistryRegistrar::new(RegistryScope::User).location(), r"HKCU\Environment");
        assert!(RegistryRegistrar::new(RegistryScope::Machine)
            .location()
            .starts_with(r"HKLM\SYSTEM"));
    }
}
