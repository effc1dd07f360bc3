//! Open-mode flags controlling resolution and access.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bitset of open-mode flags.
///
/// Combine flags with `|`, e.g. `OpenMode::READ | OpenMode::VERBOSE`. When
/// neither [`OpenMode::OPAQUE`] nor [`OpenMode::VERBOSE`] is present the mode
/// is *transparent*: archive descent scans every registered archive type
/// along the path.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct OpenMode(u32);

impl OpenMode {
    /// Open for reading. Archives are always read-only.
    pub const READ: OpenMode = OpenMode(0x0001);
    /// Open for writing, creating the file if it does not exist.
    pub const WRITE: OpenMode = OpenMode(0x0002);
    /// Position the cursor at the end of the file on open.
    pub const APPEND: OpenMode = OpenMode(0x0004);
    /// With [`OpenMode::WRITE`]: fail if the file already exists.
    pub const EXCLUSIVE: OpenMode = OpenMode(0x0008);
    /// With [`OpenMode::WRITE`]: empty the file on open.
    pub const TRUNCATE: OpenMode = OpenMode(0x0010);
    /// Never descend into archives; exact-path semantics only.
    pub const OPAQUE: OpenMode = OpenMode(0x0020);
    /// Descend only into archives explicitly named in the path.
    pub const VERBOSE: OpenMode = OpenMode(0x0040);
    /// Do not auto-create parent directories when opening for write.
    pub const NO_CREATE_DIRS: OpenMode = OpenMode(0x0080);
    /// Reject paths that escape their resolved root through `..`.
    pub const NO_ABOVE_ROOT_NAVIGATION: OpenMode = OpenMode(0x0100);
    /// Bypass the mount lists entirely.
    pub const IGNORE_MOUNTS: OpenMode = OpenMode(0x0200);
    /// Restrict resolution to the mount lists.
    pub const ONLY_MOUNTS: OpenMode = OpenMode(0x0400);
    /// Reject any path containing a `.` or `..` segment.
    pub const NO_SPECIAL_DIRS: OpenMode = OpenMode(0x0800);

    /// `true` when every flag in `other` is also set in `self`.
    pub fn contains(self, other: OpenMode) -> bool {
        (self.0 & other.0) == other.0
    }

    /// `self` with every flag in `other` cleared.
    pub fn without(self, other: OpenMode) -> OpenMode {
        OpenMode(self.0 & !other.0)
    }

    pub fn is_read(self) -> bool {
        self.contains(OpenMode::READ)
    }

    pub fn is_write(self) -> bool {
        self.contains(OpenMode::WRITE)
    }

    pub fn is_append(self) -> bool {
        self.contains(OpenMode::APPEND)
    }

    pub fn is_opaque(self) -> bool {
        self.contains(OpenMode::OPAQUE)
    }

    pub fn is_verbose(self) -> bool {
        self.contains(OpenMode::VERBOSE)
    }

    /// Transparent is the absence of both `OPAQUE` and `VERBOSE`.
    pub fn is_transparent(self) -> bool {
        !self.is_opaque() && !self.is_verbose()
    }

    /// `true` when no flag at all is set. An empty mode is rejected by the
    /// open entry points.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for OpenMode {
    type Output = OpenMode;

    fn bitor(self, rhs: OpenMode) -> OpenMode {
        OpenMode(self.0 | rhs.0)
    }
}

impl BitOrAssign for OpenMode {
    fn bitor_assign(&mut self, rhs: OpenMode) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(OpenMode, &str); 12] = [
            (OpenMode::READ, "read"),
            (OpenMode::WRITE, "write"),
            (OpenMode::APPEND, "append"),
            (OpenMode::EXCLUSIVE, "exclusive"),
            (OpenMode::TRUNCATE, "truncate"),
            (OpenMode::OPAQUE, "opaque"),
            (OpenMode::VERBOSE, "verbose"),
            (OpenMode::NO_CREATE_DIRS, "no-create-dirs"),
            (OpenMode::NO_ABOVE_ROOT_NAVIGATION, "no-above-root"),
            (OpenMode::IGNORE_MOUNTS, "ignore-mounts"),
            (OpenMode::ONLY_MOUNTS, "only-mounts"),
            (OpenMode::NO_SPECIAL_DIRS, "no-special-dirs"),
        ];

        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }

        if first {
            f.write_str("none")?;
        }

        Ok(())
    }
}
