//! Factories for the well-known attributes of an uninstall entry.

use crate::attribute::{AttributeType, AttributeValue};

/// Layout of InstallDate values, in `strftime` notation (for example `20240131`).
pub const INSTALL_DATE_FORMAT: &str = "%Y%m%d";

/// Returns a DisplayName attribute.
pub fn display_name(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("DisplayName", data, AttributeType::String)
}

/// Returns a DisplayVersion attribute.
pub fn display_version(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("DisplayVersion", data, AttributeType::String)
}

/// Returns a Publisher attribute.
pub fn publisher(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("Publisher", data, AttributeType::String)
}

/// Returns a VersionMajor attribute.
pub fn version_major(data: u32) -> AttributeValue {
    uint32_attr("VersionMajor", data)
}

/// Returns a VersionMinor attribute.
pub fn version_minor(data: u32) -> AttributeValue {
    uint32_attr("VersionMinor", data)
}

/// Returns a Version attribute.
pub fn version(data: u32) -> AttributeValue {
    uint32_attr("Version", data)
}

/// Returns a HelpLink attribute.
pub fn help_link(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("HelpLink", data, AttributeType::String)
}

/// Returns a HelpTelephone attribute.
pub fn help_telephone(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("HelpTelephone", data, AttributeType::String)
}

/// Returns an InstallDate attribute. The date should follow [`INSTALL_DATE_FORMAT`].
pub fn install_date(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("InstallDate", data, AttributeType::String)
}

/// Returns an InstallLocation attribute.
pub fn install_location(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("InstallLocation", data, AttributeType::String)
}

/// Returns an InstallSource attribute.
pub fn install_source(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("InstallSource", data, AttributeType::String)
}

/// Returns a URLInfoAbout attribute.
pub fn url_info_about(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("URLInfoAbout", data, AttributeType::String)
}

/// Returns a URLUpdateInfo attribute.
pub fn url_update_info(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("URLUpdateInfo", data, AttributeType::String)
}

/// Returns an AuthorizedCDFPrefix attribute.
pub fn authorized_cdf_prefix(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("AuthorizedCDFPrefix", data, AttributeType::String)
}

/// Returns a Comments attribute.
pub fn comments(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("Comments", data, AttributeType::String)
}

/// Returns a Contact attribute.
pub fn contact(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("Contact", data, AttributeType::String)
}

/// Returns an EstimatedSize attribute. The size is in KiB.
pub fn estimated_size(kb: u32) -> AttributeValue {
    uint32_attr("EstimatedSize", kb)
}

/// Returns a Language attribute.
pub fn language(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("Language", data, AttributeType::String)
}

/// Returns a ModifyPath attribute.
pub fn modify_path(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("ModifyPath", data, AttributeType::String)
}

/// Returns a Readme attribute.
pub fn readme(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("Readme", data, AttributeType::String)
}

/// Returns an UninstallString attribute.
pub fn uninstall_string(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("UninstallString", data, AttributeType::String)
}

/// Returns a QuietUninstallString attribute.
pub fn quiet_uninstall_string(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("QuietUninstallString", data, AttributeType::String)
}

/// Returns a SettingsIdentifier attribute.
pub fn settings_identifier(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("SettingsIdentifier", data, AttributeType::String)
}

/// Returns a DisplayIcon attribute.
pub fn display_icon(data: impl Into<String>) -> AttributeValue {
    AttributeValue::new("DisplayIcon", data, AttributeType::String)
}

/// Returns a NoModify attribute. A non-zero value hides the modify action.
pub fn no_modify(data: u32) -> AttributeValue {
    uint32_attr("NoModify", data)
}

/// Returns a NoRepair attribute. A non-zero value hides the repair action.
pub fn no_repair(data: u32) -> AttributeValue {
    uint32_attr("NoRepair", data)
}

/// Returns an attribute of the given name holding an expandable string.
///
/// Environment references such as `%ProgramFiles%` are kept verbatim; readers
/// of the value decide whether to expand them.
pub fn expandable(name: impl Into<String>, data: impl Into<String>) -> AttributeValue {
    AttributeValue::new(name, data, AttributeType::Expand)
}

fn uint32_attr(name: &str, data: u32) -> AttributeValue {
    AttributeValue::new(name, data.to_string(), AttributeType::Uint32)
}
