//! Primitives of the hierarchical configuration store that holds the
//! application registry.

use std::fmt;
use std::ops::BitOr;

use thiserror::Error;

/// Top-level root of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hive {
    LocalMachine,
    CurrentUser,
}

impl Hive {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LocalMachine => "HKEY_LOCAL_MACHINE",
            Self::CurrentUser => "HKEY_CURRENT_USER",
        }
    }
}

/// Word-width qualifier applied when opening keys. It selects between the
/// 32-bit and 64-bit views of redirected parts of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WordWidth {
    Bits32,
    Bits64,
}

/// Access rights requested when a key is opened.
///
/// Rights are enforced at open time, so every caller asks for exactly what
/// it needs and nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Access(u32);

impl Access {
    pub const NONE: Self = Self(0);
    pub const QUERY_VALUE: Self = Self(0x0001);
    pub const SET_VALUE: Self = Self(0x0002);
    pub const CREATE_SUB_KEY: Self = Self(0x0004);
    pub const ENUMERATE_SUB_KEYS: Self = Self(0x0008);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Access {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// On-disk type of a stored value, as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    None,
    String,
    ExpandString,
    Dword,
    Other(u32),
}

impl ValueKind {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::None,
            1 => Self::String,
            2 => Self::ExpandString,
            4 => Self::Dword,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("REG_NONE"),
            Self::String => f.write_str("REG_SZ"),
            Self::ExpandString => f.write_str("REG_EXPAND_SZ"),
            Self::Dword => f.write_str("REG_DWORD"),
            Self::Other(code) => write!(f, "type {code}"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("the system cannot find the key or value specified")]
    NotFound,
    #[error("access is denied")]
    AccessDenied,
    #[error("more data is available ({required} bytes required)")]
    MoreData { required: usize },
    #[error("invalid key or value name")]
    InvalidName,
    #[error("store operation failed with error code {code}")]
    Os { code: u32 },
}

/// Entry point into a hierarchical store of named, typed values.
pub trait Store {
    type Key: StoreKey;

    /// Opens an existing key below one of the store's hives.
    fn open_root(
        &self,
        hive: Hive,
        path: &str,
        access: Access,
        width: WordWidth,
    ) -> Result<Self::Key, StoreError>;
}

/// An open key. The handle is released when the value is dropped.
///
/// Sub-keys opened or created through a key inherit its word-width
/// qualifier.
pub trait StoreKey: Sized {
    fn open_subkey(&self, name: &str, access: Access) -> Result<Self, StoreError>;

    /// Creates the named sub-key, or opens it when it already exists. The
    /// returned flag is `true` when the key existed before the call. Creation
    /// is atomic: of two racing callers exactly one sees `false`.
    fn create_subkey(&self, name: &str, access: Access) -> Result<(Self, bool), StoreError>;

    /// Deletes the named sub-key together with all of its values.
    fn delete_subkey(&self, name: &str) -> Result<(), StoreError>;

    fn subkey_names(&self) -> Result<Vec<String>, StoreError>;

    fn value_names(&self) -> Result<Vec<String>, StoreError>;

    fn set_string(&self, name: &str, data: &str) -> Result<(), StoreError>;

    fn set_expand_string(&self, name: &str, data: &str) -> Result<(), StoreError>;

    fn set_dword(&self, name: &str, data: u32) -> Result<(), StoreError>;

    /// Copies the raw bytes of the named value into `buf`, returning the
    /// number of bytes written and the value's type.
    ///
    /// When `buf` is too small the call fails with
    /// [`StoreError::MoreData`] carrying the exact size needed.
    fn get_value(&self, name: &str, buf: &mut [u8]) -> Result<(usize, ValueKind), StoreError>;
}

/// Encodes text the way the store records string values: little-endian
/// UTF-16 followed by a NUL code unit.
pub(crate) fn encode_utf16_value(data: &str) -> Vec<u8> {
    data.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}
