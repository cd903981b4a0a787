use console::Style;
use once_cell::sync::Lazy;
use outstanding::{rgb_to_ansi256, Theme};

/// Style names shared between the templates and the renderer.
pub mod names {
    pub const HEADER: &str = "header";
    pub const TITLE: &str = "title";
    pub const ID: &str = "id";
    pub const LABEL: &str = "label";
    pub const MUTED: &str = "muted";
    pub const TRANSLATED: &str = "translated";
    pub const INFO: &str = "info";
    pub const SUCCESS: &str = "success";
    pub const WARNING: &str = "warning";
    pub const ERROR: &str = "error";
}

pub static KUTTI_THEME: Lazy<Theme> = Lazy::new(|| {
    let grey = Style::new().color256(rgb_to_ansi256((154, 154, 154)));
    Theme::new()
        .add(names::HEADER, Style::new().bold().underlined())
        .add(names::TITLE, Style::new().bold())
        .add(names::ID, Style::new().yellow())
        .add(names::LABEL, Style::new().cyan())
        .add(names::MUTED, grey.clone().italic())
        .add(names::TRANSLATED, Style::new().magenta())
        .add(names::INFO, grey)
        .add(names::SUCCESS, Style::new().green())
        .add(names::WARNING, Style::new().yellow())
        .add(names::ERROR, Style::new().red())
});
