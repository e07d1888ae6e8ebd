//! Conversion between attribute lists and the typed values stored under an
//! application's key.

use tracing::debug;
use winapp_core::{parse_decimal_u32, App, AppId, AttributeList, AttributeType, AttributeValue};

use crate::error::{RegistryError, Target};
use crate::store::{StoreError, StoreKey, ValueKind};

/// Initial size of the buffer values are read into.
pub const READ_BUFFER_SIZE: usize = 4096;

/// Values this large or larger are refused on read.
pub const MAX_VALUE_SIZE: usize = 1 << 20;

/// Writes every attribute of `app` under `key`, stopping at the first
/// failure. Attributes written before the failure stay in place.
pub(crate) fn write_app<K: StoreKey>(
    view: &'static str,
    app: &App,
    key: &K,
) -> Result<(), RegistryError> {
    for attr in &app.attributes {
        write_attribute(view, &app.id, key, attr)?;
    }
    Ok(())
}

fn write_attribute<K: StoreKey>(
    view: &'static str,
    id: &AppId,
    key: &K,
    attr: &AttributeValue,
) -> Result<(), RegistryError> {
    let malformed = |reason: String| RegistryError::MalformedValue {
        view,
        id: id.clone(),
        name: attr.name.clone(),
        reason,
    };
    let written = match attr.kind {
        AttributeType::String | AttributeType::Expand if attr.data.contains('\0') => {
            return Err(malformed("string data must not contain NUL characters".to_string()));
        }
        AttributeType::String => key.set_string(&attr.name, &attr.data),
        AttributeType::Expand => key.set_expand_string(&attr.name, &attr.data),
        AttributeType::Uint32 => {
            let data = parse_decimal_u32(&attr.data).ok_or_else(|| {
                malformed(format!(
                    "\"{}\" is not a 32-bit unsigned decimal integer",
                    attr.data
                ))
            })?;
            key.set_dword(&attr.name, data)
        }
        AttributeType::None => {
            return Err(RegistryError::UnsupportedAttributeType {
                view,
                id: id.clone(),
                name: attr.name.clone(),
                kind: attr.kind,
            });
        }
    };
    written.map_err(|source| {
        RegistryError::from_store(
            view,
            "write",
            Target::Value {
                id: id.clone(),
                name: attr.name.clone(),
            },
            source,
        )
    })
}

/// Reads every value under `key` into an attribute list.
///
/// Strings and expandable strings become text, 32-bit integers become their
/// decimal text. Values of any other type are skipped.
pub(crate) fn read_app<K: StoreKey>(
    view: &'static str,
    id: &AppId,
    key: &K,
) -> Result<AttributeList, RegistryError> {
    let names = key.value_names().map_err(|source| {
        RegistryError::from_store(view, "enumerate values of", Target::App(id.clone()), source)
    })?;

    let mut attrs = AttributeList::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    for name in names {
        let (len, kind) = read_value(key, &name, &mut buf).map_err(|source| {
            RegistryError::from_store(
                view,
                "read",
                Target::Value {
                    id: id.clone(),
                    name: name.clone(),
                },
                source,
            )
        })?;
        let data = &buf[..len];

        match kind {
            ValueKind::String => {
                attrs.push(AttributeValue::new(name, decode_utf16(data), AttributeType::String))
            }
            ValueKind::ExpandString => {
                attrs.push(AttributeValue::new(name, decode_utf16(data), AttributeType::Expand))
            }
            ValueKind::Dword => {
                let bytes: [u8; 4] =
                    data.try_into()
                        .map_err(|_| RegistryError::MalformedValue {
                            view,
                            id: id.clone(),
                            name: name.clone(),
                            reason: format!("integer value is {len} bytes long, expected 4"),
                        })?;
                attrs.push(AttributeValue::new(
                    name,
                    u32::from_le_bytes(bytes).to_string(),
                    AttributeType::Uint32,
                ));
            }
            other => debug!(%id, value = %name, kind = %other, "skipping value of unsupported type"),
        }
    }

    Ok(attrs)
}

/// Reads one value into `buf`. When the value does not fit, `buf` is
/// replaced by a buffer of exactly the reported size and the read is tried
/// once more, unless the size reaches [`MAX_VALUE_SIZE`].
fn read_value<K: StoreKey>(
    key: &K,
    name: &str,
    buf: &mut Vec<u8>,
) -> Result<(usize, ValueKind), StoreError> {
    match key.get_value(name, buf) {
        Err(StoreError::MoreData { required }) if required < MAX_VALUE_SIZE => {
            *buf = vec![0u8; required];
            key.get_value(name, buf)
        }
        result => result,
    }
}

/// Decodes little-endian UTF-16 text. Decoding ends at the first NUL code
/// unit or at the end of `data`; a trailing odd byte is ignored.
pub(crate) fn decode_utf16(data: &[u8]) -> String {
    let units = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0);
    char::decode_utf16(units)
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
