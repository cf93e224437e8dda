use crate::error::Error;
use derive_more::{Display, From, Into};
use std::fmt;
use std::ops::BitOr;

/// Index into the global string table.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, From, Into, Display)]
#[repr(transparent)]
pub struct StringRef(pub u32);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, From, Into, Display)]
#[repr(transparent)]
pub struct RegionRef(pub u32);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, From, Into, Display)]
#[repr(transparent)]
pub struct AttrRef(pub u32);

/// Locations are the only 64-bit references in the format.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, From, Into, Display)]
#[repr(transparent)]
pub struct LocationRef(pub u64);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, From, Into, Display)]
#[repr(transparent)]
pub struct LocationGroupRef(pub u32);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, From, Into, Display)]
#[repr(transparent)]
pub struct IoFileRef(pub u32);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, From, Into, Display)]
#[repr(transparent)]
pub struct IoHandleRef(pub u32);

/// Minimum diagnostic severity selected on the command line.
///
/// `CRITICAL` is accepted for parity with the level names users expect from
/// other trace tooling; tracing has no severity above `ERROR`, so it maps
/// there.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Display, clap::ValueEnum,
)]
pub enum LogLevel {
    #[default]
    #[value(name = "INFO")]
    #[display(fmt = "INFO")]
    Info,
    #[value(name = "DEBUG")]
    #[display(fmt = "DEBUG")]
    Debug,
    #[value(name = "WARNING")]
    #[display(fmt = "WARNING")]
    Warning,
    #[value(name = "ERROR")]
    #[display(fmt = "ERROR")]
    Error,
    #[value(name = "CRITICAL")]
    #[display(fmt = "CRITICAL")]
    Critical,
}

impl LogLevel {
    pub fn as_level(self) -> tracing::Level {
        match self {
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Error | LogLevel::Critical => tracing::Level::ERROR,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub enum IoAccessMode {
    #[display(fmt = "READ_ONLY")]
    ReadOnly,
    #[display(fmt = "WRITE_ONLY")]
    WriteOnly,
    #[display(fmt = "READ_WRITE")]
    ReadWrite,
}

impl IoAccessMode {
    pub(crate) fn from_u8(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(IoAccessMode::ReadOnly),
            1 => Ok(IoAccessMode::WriteOnly),
            2 => Ok(IoAccessMode::ReadWrite),
            value => Err(Error::MalformedEnum {
                what: "I/O access mode",
                value,
            }),
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            IoAccessMode::ReadOnly => 0,
            IoAccessMode::WriteOnly => 1,
            IoAccessMode::ReadWrite => 2,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub enum IoOperationMode {
    #[display(fmt = "READ")]
    Read,
    #[display(fmt = "WRITE")]
    Write,
    #[display(fmt = "FLUSH")]
    Flush,
}

impl IoOperationMode {
    pub(crate) fn from_u8(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(IoOperationMode::Read),
            1 => Ok(IoOperationMode::Write),
            2 => Ok(IoOperationMode::Flush),
            value => Err(Error::MalformedEnum {
                what: "I/O operation mode",
                value,
            }),
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            IoOperationMode::Read => 0,
            IoOperationMode::Write => 1,
            IoOperationMode::Flush => 2,
        }
    }
}

/// Origin of an I/O seek, rendered POSIX-style (`SET`/`CURRENT`/`END`).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub enum IoSeekWhence {
    #[display(fmt = "SET")]
    Set,
    #[display(fmt = "CURRENT")]
    Current,
    #[display(fmt = "END")]
    End,
}

impl IoSeekWhence {
    pub(crate) fn from_u8(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(IoSeekWhence::Set),
            1 => Ok(IoSeekWhence::Current),
            2 => Ok(IoSeekWhence::End),
            value => Err(Error::MalformedEnum {
                what: "I/O seek whence",
                value,
            }),
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            IoSeekWhence::Set => 0,
            IoSeekWhence::Current => 1,
            IoSeekWhence::End => 2,
        }
    }
}

/// Flags supplied when an I/O handle is created.
///
/// Unknown bits are carried through untouched and simply omitted from the
/// symbolic rendering.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, From, Into)]
#[repr(transparent)]
pub struct IoCreationFlags(pub u32);

impl IoCreationFlags {
    pub const NONE: Self = IoCreationFlags(0);
    pub const CREAT: Self = IoCreationFlags(1);
    pub const TRUNC: Self = IoCreationFlags(1 << 1);
    pub const DIRECTORY: Self = IoCreationFlags(1 << 2);
    pub const EXCL: Self = IoCreationFlags(1 << 3);

    const NAMES: [(u32, &'static str); 4] = [
        (Self::CREAT.0, "CREAT"),
        (Self::TRUNC.0, "TRUNC"),
        (Self::DIRECTORY.0, "DIRECTORY"),
        (Self::EXCL.0, "EXCL"),
    ];

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for IoCreationFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        IoCreationFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for IoCreationFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_flags(f, self.0, &Self::NAMES)
    }
}

/// Status flags of an open I/O handle.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, From, Into)]
#[repr(transparent)]
pub struct IoStatusFlags(pub u32);

impl IoStatusFlags {
    pub const NONE: Self = IoStatusFlags(0);
    pub const APPEND: Self = IoStatusFlags(1);
    pub const NONBLOCK: Self = IoStatusFlags(1 << 1);
    pub const SYNC: Self = IoStatusFlags(1 << 2);

    const NAMES: [(u32, &'static str); 3] = [
        (Self::APPEND.0, "APPEND"),
        (Self::NONBLOCK.0, "NONBLOCK"),
        (Self::SYNC.0, "SYNC"),
    ];

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for IoStatusFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        IoStatusFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for IoStatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_flags(f, self.0, &Self::NAMES)
    }
}

fn display_flags(f: &mut fmt::Formatter<'_>, bits: u32, names: &[(u32, &'static str)]) -> fmt::Result {
    if bits == 0 {
        return f.write_str("NONE");
    }
    let mut first = true;
    for (bit, name) in names {
        if bits & bit != 0 {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(name)?;
            first = false;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flags_render_symbolically() {
        assert_eq!(IoCreationFlags::NONE.to_string(), "NONE");
        assert_eq!(
            (IoCreationFlags::CREAT | IoCreationFlags::TRUNC).to_string(),
            "CREAT|TRUNC"
        );
        assert_eq!(IoStatusFlags::APPEND.to_string(), "APPEND");
        assert_eq!(IoSeekWhence::Set.to_string(), "SET");
        assert_eq!(IoAccessMode::ReadWrite.to_string(), "READ_WRITE");
    }

    #[test]
    fn log_level_maps_critical_to_error() {
        assert_eq!(LogLevel::Critical.as_level(), tracing::Level::ERROR);
        assert_eq!(LogLevel::default().as_level(), tracing::Level::INFO);
    }
}
