//! Mount profiles loaded from TOML.
//!
//! A profile describes the mounts and archive-cache tuning of a filesystem
//! so applications can ship their layout as data:
//!
//! ```toml
//! archive-gc-threshold = 4
//!
//! [[mount]]
//! source = "assets/base"
//! prefix = "/assets"
//!
//! [[mount]]
//! source = "assets/patch.zip"
//! prefix = "/assets"
//! priority = "highest"
//!
//! [[write-mount]]
//! source = "save"
//! prefix = "/save"
//! ```

use serde::Deserialize;

use crate::error::{FsError, FsResult};
use crate::vfs::{Fs, MountPriority};

/// One mount record of a profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MountEntry {
    /// Path of the directory or archive to mount.
    pub source: String,
    /// Virtual prefix the mount contributes under.
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub priority: Priority,
}

/// Serialized form of [`MountPriority`].
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Highest,
    #[default]
    Lowest,
}

impl From<Priority> for MountPriority {
    fn from(priority: Priority) -> MountPriority {
        match priority {
            Priority::Highest => MountPriority::Highest,
            Priority::Lowest => MountPriority::Lowest,
        }
    }
}

/// A deserialized mount profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct MountProfile {
    #[serde(default)]
    pub archive_gc_threshold: Option<usize>,
    #[serde(default, rename = "mount")]
    pub mounts: Vec<MountEntry>,
    #[serde(default, rename = "write-mount")]
    pub write_mounts: Vec<MountEntry>,
}

impl MountProfile {
    /// Parses a profile from TOML text.
    pub fn from_toml(text: &str) -> FsResult<Self> {
        toml::from_str(text).map_err(|_| FsError::InvalidFile)
    }

    /// Applies the profile to `fs`: mounts are registered in declaration
    /// order, so earlier `highest` entries end up behind later ones.
    pub fn apply(&self, fs: &Fs) -> FsResult<()> {
        if let Some(threshold) = self.archive_gc_threshold {
            fs.set_archive_gc_threshold(threshold);
        }

        for entry in &self.mounts {
            fs.mount(&entry.source, &entry.prefix, entry.priority.into())?;
        }

        for entry in &self.write_mounts {
            fs.mount_write(&entry.source, &entry.prefix, entry.priority.into())?;
        }

        Ok(())
    }
}
