use anstyle::{AnsiColor, Effects, Style};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn resolve_output_style(stdout_is_tty: bool) -> OutputStyle {
    if stdout_is_tty {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

pub(crate) fn current_output_style(force_plain: bool) -> OutputStyle {
    use std::io::IsTerminal;

    if force_plain || std::env::var_os("NO_COLOR").is_some() {
        return OutputStyle::Plain;
    }
    resolve_output_style(std::io::stdout().is_terminal())
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

pub(crate) fn render_view_header(style: OutputStyle, view_name: &str) -> String {
    let line = format!("---- {view_name} ----");
    match style {
        OutputStyle::Plain => line,
        OutputStyle::Rich => colorize(section_style(), &line),
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "error" => "[ERR]",
        _ => "[..]",
    }
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
