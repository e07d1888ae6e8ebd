use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::Args;
use semver::Version;
use serde::Serialize;
use winapp_core::{attrs, App, AppId, Architecture, Scope};
use winapp_registry::{Store, View};

use crate::render::{render_status_line, render_view_header, OutputStyle};

const DEFAULT_ARCH: &str = "x64";
const DEFAULT_SCOPE: &str = "machine";

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct ViewArgs {
    /// Architecture of the view: x64 or x86.
    #[arg(long)]
    pub(crate) arch: Option<String>,
    /// Scope of the view: machine or user.
    #[arg(long)]
    pub(crate) scope: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct AddAttributes {
    #[arg(long)]
    pub(crate) display_name: Option<String>,
    #[arg(long)]
    pub(crate) display_version: Option<String>,
    #[arg(long)]
    pub(crate) publisher: Option<String>,
    /// Installed size in KiB.
    #[arg(long)]
    pub(crate) estimated_size: Option<u32>,
    #[arg(long)]
    pub(crate) install_location: Option<String>,
    #[arg(long)]
    pub(crate) uninstall_string: Option<String>,
}

#[derive(Debug, Serialize)]
struct ViewListing<'a> {
    view: &'static str,
    architecture: Architecture,
    scope: Scope,
    apps: &'a [App],
}

/// Selects the views a command works on. Without any selector, `list` covers
/// every view and the other commands use the 64-bit machine view.
pub(crate) fn resolve_views(args: &ViewArgs, all_by_default: bool) -> Result<Vec<View>> {
    if all_by_default && args.arch.is_none() && args.scope.is_none() {
        return Ok(View::ALL.to_vec());
    }
    let view = View::for_names(
        args.arch.as_deref().unwrap_or(DEFAULT_ARCH),
        args.scope.as_deref().unwrap_or(DEFAULT_SCOPE),
    )?;
    Ok(vec![view])
}

pub(crate) fn resolve_view(args: &ViewArgs) -> Result<View> {
    resolve_views(args, false)?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no application registry view selected"))
}

pub(crate) fn format_app_line(app: &App) -> String {
    let mut line = app.id.to_string();
    let name = app.attributes.get_string("DisplayName");
    if !name.is_empty() {
        line.push_str(": ");
        line.push_str(name);
    }
    let version = app.attributes.get_string("DisplayVersion");
    if !version.is_empty() {
        line.push_str(&format!(" [{version}]"));
    }
    line
}

/// Lists each view under its own header. A view that cannot be read is
/// reported in place and the remaining views are still listed.
pub(crate) fn list_view_lines<S: Store>(
    store: &S,
    views: &[View],
    style: OutputStyle,
) -> Vec<String> {
    let mut lines = Vec::new();
    for view in views {
        lines.push(render_view_header(style, view.name()));
        match view.list(store) {
            Ok(apps) => {
                for app in &apps {
                    lines.push(format!("  {}", format_app_line(app)));
                }
            }
            Err(err) => {
                let err = anyhow::Error::new(err);
                lines.push(render_status_line(style, "error", &format!("Error: {err:#}")));
            }
        }
    }
    lines
}

pub(crate) fn list_views_json<S: Store>(store: &S, views: &[View]) -> Result<String> {
    let mut listed = Vec::with_capacity(views.len());
    for view in views {
        let apps = view
            .list(store)
            .with_context(|| format!("failed to read the {} application registry", view.name()))?;
        listed.push((*view, apps));
    }
    let listings = listed
        .iter()
        .map(|(view, apps)| ViewListing {
            view: view.name(),
            architecture: view.architecture(),
            scope: view.scope(),
            apps,
        })
        .collect::<Vec<_>>();
    serde_json::to_string_pretty(&listings).context("failed to serialize application listing")
}

pub(crate) fn show_app<S: Store>(store: &S, view: View, id: &str, json: bool) -> Result<Vec<String>> {
    let app = view
        .get(store, &AppId::from(id))
        .with_context(|| format!("failed to read application '{id}'"))?;
    if json {
        let rendered =
            serde_json::to_string_pretty(&app).context("failed to serialize application")?;
        return Ok(vec![rendered]);
    }
    Ok(format_show_lines(&app))
}

pub(crate) fn format_show_lines(app: &App) -> Vec<String> {
    let mut lines = vec![app.id.to_string()];
    lines.extend(app.attributes.iter().map(|attr| format!("  {attr}")));
    lines
}

pub(crate) fn contains_app<S: Store>(store: &S, view: View, id: &str) -> Result<&'static str> {
    let present = view.contains(store, &AppId::from(id)).with_context(|| {
        format!(
            "failed to determine whether application '{id}' is in the {} application registry",
            view.name()
        )
    })?;
    Ok(if present { "present" } else { "absent" })
}

pub(crate) fn build_app(id: &str, attributes: &AddAttributes, today: NaiveDate) -> Result<App> {
    let mut list = Vec::new();
    if let Some(name) = &attributes.display_name {
        list.push(attrs::display_name(name.as_str()));
    }
    if let Some(version) = &attributes.display_version {
        list.push(attrs::display_version(version.as_str()));
        if let Ok(parsed) = Version::parse(version) {
            let major = u32::try_from(parsed.major)
                .with_context(|| format!("major version of '{version}' does not fit in 32 bits"))?;
            let minor = u32::try_from(parsed.minor)
                .with_context(|| format!("minor version of '{version}' does not fit in 32 bits"))?;
            list.push(attrs::version_major(major));
            list.push(attrs::version_minor(minor));
        }
    }
    if let Some(publisher) = &attributes.publisher {
        list.push(attrs::publisher(publisher.as_str()));
    }
    list.push(attrs::install_date(
        today.format(attrs::INSTALL_DATE_FORMAT).to_string(),
    ));
    if let Some(location) = &attributes.install_location {
        list.push(attrs::install_location(location.as_str()));
    }
    if let Some(uninstall) = &attributes.uninstall_string {
        list.push(attrs::uninstall_string(uninstall.as_str()));
    }
    if let Some(size) = attributes.estimated_size {
        list.push(attrs::estimated_size(size));
    }

    let app = App::new(id, list);
    app.id
        .validate()
        .map_err(|reason| anyhow!("invalid application id '{id}': {reason}"))?;
    Ok(app)
}

pub(crate) fn load_manifest(path: &Path) -> Result<App> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read application manifest: {}", path.display()))?;
    App::from_toml_str(&content)
        .with_context(|| format!("invalid application manifest: {}", path.display()))
}

pub(crate) fn add_app<S: Store>(
    store: &S,
    view: View,
    app: &App,
    style: OutputStyle,
) -> Result<String> {
    view.add(store, app).with_context(|| {
        format!(
            "failed to add application '{}' to the {} application registry",
            app.id,
            view.name()
        )
    })?;
    Ok(render_status_line(
        style,
        "ok",
        &format!(
            "added application '{}' to the {} application registry",
            app.id,
            view.name()
        ),
    ))
}

pub(crate) fn remove_app<S: Store>(
    store: &S,
    view: View,
    id: &str,
    style: OutputStyle,
) -> Result<String> {
    view.remove(store, &AppId::from(id)).with_context(|| {
        format!(
            "failed to remove application '{id}' from the {} application registry",
            view.name()
        )
    })?;
    Ok(render_status_line(
        style,
        "ok",
        &format!(
            "removed application '{id}' from the {} application registry",
            view.name()
        ),
    ))
}
