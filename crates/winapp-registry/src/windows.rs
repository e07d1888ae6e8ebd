//! The Windows registry, accessed through the Win32 registry API.

use std::ffi::OsStr;
use std::iter;
use std::os::windows::ffi::OsStrExt;
use std::ptr;

use windows_sys::Win32::Foundation::{
    ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND, ERROR_INVALID_PARAMETER, ERROR_MORE_DATA, ERROR_NO_MORE_ITEMS,
    ERROR_SUCCESS, WIN32_ERROR,
};
use windows_sys::Win32::System::Registry::{
    RegCloseKey, RegCreateKeyExW, RegDeleteKeyExW, RegEnumKeyExW, RegEnumValueW, RegOpenKeyExW,
    RegQueryValueExW, RegSetValueExW, HKEY, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE,
    KEY_CREATE_SUB_KEY, KEY_ENUMERATE_SUB_KEYS, KEY_QUERY_VALUE, KEY_SET_VALUE, KEY_WOW64_32KEY,
    KEY_WOW64_64KEY, REG_CREATED_NEW_KEY, REG_DWORD, REG_EXPAND_SZ, REG_OPTION_NON_VOLATILE,
    REG_SZ,
};

use crate::store::{
    encode_utf16_value, Access, Hive, Store, StoreError, StoreKey, ValueKind, WordWidth,
};

// Longest key name and value name the registry accepts, plus a terminator.
const MAX_KEY_NAME_UNITS: usize = 256;
const MAX_VALUE_NAME_UNITS: usize = 16_384;

/// The host's registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsStore;

impl WindowsStore {
    pub fn new() -> Self {
        Self
    }
}

impl Store for WindowsStore {
    type Key = WindowsKey;

    fn open_root(
        &self,
        hive: Hive,
        path: &str,
        access: Access,
        width: WordWidth,
    ) -> Result<WindowsKey, StoreError> {
        let root = match hive {
            Hive::LocalMachine => HKEY_LOCAL_MACHINE,
            Hive::CurrentUser => HKEY_CURRENT_USER,
        };
        open_key(root, path, access, width)
    }
}

/// Open registry key handle, closed on drop.
#[derive(Debug)]
pub struct WindowsKey {
    handle: HKEY,
    width: WordWidth,
}

impl Drop for WindowsKey {
    fn drop(&mut self) {
        // SAFETY: the handle was returned by RegOpenKeyExW/RegCreateKeyExW and
        // is closed exactly once.
        unsafe {
            RegCloseKey(self.handle);
        }
    }
}

impl StoreKey for WindowsKey {
    fn open_subkey(&self, name: &str, access: Access) -> Result<Self, StoreError> {
        open_key(self.handle, name, access, self.width)
    }

    fn create_subkey(&self, name: &str, access: Access) -> Result<(Self, bool), StoreError> {
        let name = wide(name)?;
        let mut handle: HKEY = ptr::null_mut();
        let mut disposition = 0;
        // SAFETY: all pointers reference live locals; `name` is NUL-terminated.
        let code = unsafe {
            RegCreateKeyExW(
                self.handle,
                name.as_ptr(),
                0,
                ptr::null(),
                REG_OPTION_NON_VOLATILE,
                sam(access, self.width),
                ptr::null(),
                &mut handle,
                &mut disposition,
            )
        };
        check(code)?;
        let key = WindowsKey {
            handle,
            width: self.width,
        };
        Ok((key, disposition != REG_CREATED_NEW_KEY))
    }

    fn delete_subkey(&self, name: &str) -> Result<(), StoreError> {
        let name = wide(name)?;
        // SAFETY: `name` is NUL-terminated and outlives the call.
        let code = unsafe { RegDeleteKeyExW(self.handle, name.as_ptr(), width_flag(self.width), 0) };
        check(code)
    }

    fn subkey_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut buf = vec![0u16; MAX_KEY_NAME_UNITS];
        for index in 0.. {
            let mut len = buf.len() as u32;
            // SAFETY: `buf` holds `len` code units; unused out-params are null.
            let code = unsafe {
                RegEnumKeyExW(
                    self.handle,
                    index,
                    buf.as_mut_ptr(),
                    &mut len,
                    ptr::null(),
                    ptr::null_mut(),
                    ptr::null_mut(),
                    ptr::null_mut(),
                )
            };
            if code == ERROR_NO_MORE_ITEMS {
                break;
            }
            check(code)?;
            names.push(String::from_utf16_lossy(&buf[..len as usize]));
        }
        Ok(names)
    }

    fn value_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut buf = vec![0u16; MAX_VALUE_NAME_UNITS];
        for index in 0.. {
            let mut len = buf.len() as u32;
            // SAFETY: `buf` holds `len` code units; type and data are not requested.
            let code = unsafe {
                RegEnumValueW(
                    self.handle,
                    index,
                    buf.as_mut_ptr(),
                    &mut len,
                    ptr::null(),
                    ptr::null_mut(),
                    ptr::null_mut(),
                    ptr::null_mut(),
                )
            };
            if code == ERROR_NO_MORE_ITEMS {
                break;
            }
            check(code)?;
            names.push(String::from_utf16_lossy(&buf[..len as usize]));
        }
        Ok(names)
    }

    fn set_string(&self, name: &str, data: &str) -> Result<(), StoreError> {
        self.set_value(name, REG_SZ, &encode_utf16_value(data))
    }

    fn set_expand_string(&self, name: &str, data: &str) -> Result<(), StoreError> {
        self.set_value(name, REG_EXPAND_SZ, &encode_utf16_value(data))
    }

    fn set_dword(&self, name: &str, data: u32) -> Result<(), StoreError> {
        self.set_value(name, REG_DWORD, &data.to_le_bytes())
    }

    fn get_value(&self, name: &str, buf: &mut [u8]) -> Result<(usize, ValueKind), StoreError> {
        let name = wide(name)?;
        let mut kind = 0;
        let mut len = u32::try_from(buf.len()).unwrap_or(u32::MAX);
        let data = if buf.is_empty() {
            ptr::null_mut()
        } else {
            buf.as_mut_ptr()
        };
        // SAFETY: `data` is null or points at `len` writable bytes.
        let code = unsafe {
            RegQueryValueExW(
                self.handle,
                name.as_ptr(),
                ptr::null(),
                &mut kind,
                data,
                &mut len,
            )
        };
        if code == ERROR_MORE_DATA || (data.is_null() && code == ERROR_SUCCESS && len > 0) {
            return Err(StoreError::MoreData {
                required: len as usize,
            });
        }
        check(code)?;
        Ok((len as usize, ValueKind::from_code(kind)))
    }
}

impl WindowsKey {
    fn set_value(&self, name: &str, kind: u32, data: &[u8]) -> Result<(), StoreError> {
        let name = wide(name)?;
        let len = u32::try_from(data.len()).map_err(|_| StoreError::Os {
            code: ERROR_INVALID_PARAMETER,
        })?;
        // SAFETY: `data` is valid for `len` bytes and `name` is NUL-terminated.
        let code =
            unsafe { RegSetValueExW(self.handle, name.as_ptr(), 0, kind, data.as_ptr(), len) };
        check(code)
    }
}

fn open_key(
    parent: HKEY,
    path: &str,
    access: Access,
    width: WordWidth,
) -> Result<WindowsKey, StoreError> {
    let path = wide(path)?;
    let mut handle: HKEY = ptr::null_mut();
    // SAFETY: `path` is NUL-terminated and `handle` is a live out-param.
    let code = unsafe { RegOpenKeyExW(parent, path.as_ptr(), 0, sam(access, width), &mut handle) };
    check(code)?;
    Ok(WindowsKey { handle, width })
}

fn sam(access: Access, width: WordWidth) -> u32 {
    let mut sam = 0;
    if access.contains(Access::QUERY_VALUE) {
        sam |= KEY_QUERY_VALUE;
    }
    if access.contains(Access::SET_VALUE) {
        sam |= KEY_SET_VALUE;
    }
    if access.contains(Access::CREATE_SUB_KEY) {
        sam |= KEY_CREATE_SUB_KEY;
    }
    if access.contains(Access::ENUMERATE_SUB_KEYS) {
        sam |= KEY_ENUMERATE_SUB_KEYS;
    }
    sam | width_flag(width)
}

fn width_flag(width: WordWidth) -> u32 {
    match width {
        WordWidth::Bits32 => KEY_WOW64_32KEY,
        WordWidth::Bits64 => KEY_WOW64_64KEY,
    }
}

fn wide(text: &str) -> Result<Vec<u16>, StoreError> {
    if text.contains('\0') {
        return Err(StoreError::InvalidName);
    }
    Ok(OsStr::new(text)
        .encode_wide()
        .chain(iter::once(0))
        .collect())
}

fn check(code: WIN32_ERROR) -> Result<(), StoreError> {
    match code {
        ERROR_SUCCESS => Ok(()),
        ERROR_FILE_NOT_FOUND => Err(StoreError::NotFound),
        ERROR_ACCESS_DENIED => Err(StoreError::AccessDenied),
        code => Err(StoreError::Os { code }),
    }
}
