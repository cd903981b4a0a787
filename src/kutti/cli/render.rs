//! # Rendering Module
//!
//! Styled terminal output through the `outstanding` crate. Layout (column
//! widths, truncation, padding) is computed here because it needs
//! Unicode-aware measuring; the templates only pick styles.

use super::styles::{names, KUTTI_THEME};
use super::templates::{
    CARDS_TEMPLATE, DETAIL_TEMPLATE, LIST_TEMPLATE, MESSAGES_TEMPLATE, TEXT_LIST_TEMPLATE,
};
use chrono::{DateTime, Utc};
use kutti::api::{CmdMessage, Detail, Listing, MessageLevel, RouteReport};
use kutti::grid::ViewMode;
use kutti::model::Session;
use kutti::shell::role_label;
use outstanding::{render, render_with_color, ThemeChoice};
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

/// Widest a table cell may get before it is truncated.
pub const MAX_CELL_WIDTH: usize = 28;
/// Columns shown per card.
pub const CARD_FIELDS: usize = 4;
pub const TRANSLATED_MARKER: &str = "(translated)";
const COLUMN_GAP: &str = "  ";

#[derive(Serialize)]
struct RowData {
    id: String,
    text: String,
}

#[derive(Serialize)]
struct ListData {
    header: String,
    rows: Vec<RowData>,
    footer: String,
}

#[derive(Serialize)]
struct CardLine {
    label: String,
    value: String,
}

#[derive(Serialize)]
struct CardData {
    id: String,
    title: String,
    lines: Vec<CardLine>,
}

#[derive(Serialize)]
struct CardsData {
    cards: Vec<CardData>,
    footer: String,
}

#[derive(Serialize)]
struct DetailFieldData {
    label: String,
    padding: String,
    value: String,
    translated: bool,
}

#[derive(Serialize)]
struct DetailData {
    id: String,
    title: String,
    kind: String,
    fields: Vec<DetailFieldData>,
    media: Vec<String>,
    translated_marker: &'static str,
}

#[derive(Serialize)]
struct TextListData {
    lines: Vec<String>,
    empty_message: String,
}

#[derive(Serialize)]
struct MessageData {
    content: String,
    style: String,
}

#[derive(Serialize)]
struct MessagesData {
    messages: Vec<MessageData>,
}

fn render_template<T: Serialize>(template: &str, data: &T, use_color: Option<bool>) -> String {
    match use_color {
        Some(c) => render_with_color(template, data, ThemeChoice::from(&*KUTTI_THEME), c),
        None => render(template, data, ThemeChoice::from(&*KUTTI_THEME)),
    }
    .unwrap_or_else(|e| format!("Render error: {}\n", e))
}

/// Renders one page of a listing as a table or as cards.
pub fn render_listing(listing: &Listing) -> String {
    render_listing_internal(listing, None)
}

fn render_listing_internal(listing: &Listing, use_color: Option<bool>) -> String {
    match listing.view_mode {
        ViewMode::Table => render_table(listing, use_color),
        ViewMode::Cards => render_cards(listing, use_color),
    }
}

fn id_labels(listing: &Listing) -> Vec<String> {
    listing
        .ids
        .iter()
        .map(|id| id.map(|id| format!("#{}", id)).unwrap_or_default())
        .collect()
}

fn render_table(listing: &Listing, use_color: Option<bool>) -> String {
    let ids = id_labels(listing);
    let id_width = ids.iter().map(|id| id.width()).max().unwrap_or(0).max(1);

    let widths: Vec<usize> = listing
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            listing
                .cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| flatten(cell).width())
                .chain(std::iter::once(column.label.width()))
                .max()
                .unwrap_or(0)
                .min(MAX_CELL_WIDTH)
        })
        .collect();

    let labels: Vec<&str> = listing.columns.iter().map(|c| c.label.as_str()).collect();
    let header = format!(
        "{}{}{}",
        pad("#", id_width),
        COLUMN_GAP,
        layout_line(&labels, &widths)
    );

    let rows = listing
        .cells
        .iter()
        .zip(ids)
        .map(|(cells, id)| {
            let cells: Vec<&str> = cells.iter().map(String::as_str).collect();
            RowData {
                id: pad(&id, id_width),
                text: format!("{}{}", COLUMN_GAP, layout_line(&cells, &widths)),
            }
        })
        .collect();

    let data = ListData {
        header,
        rows,
        footer: footer(listing),
    };
    render_template(LIST_TEMPLATE, &data, use_color)
}

fn render_cards(listing: &Listing, use_color: Option<bool>) -> String {
    let shown = &listing.columns[..listing.columns.len().min(CARD_FIELDS)];
    let label_width = shown.iter().skip(1).map(|c| c.label.width() + 1).max().unwrap_or(0);

    let cards = listing
        .cells
        .iter()
        .zip(id_labels(listing))
        .map(|(cells, id)| CardData {
            id,
            title: cells.first().map(|c| flatten(c)).unwrap_or_default(),
            lines: shown
                .iter()
                .zip(cells.iter())
                .skip(1)
                .map(|(column, value)| CardLine {
                    label: pad(&format!("{}:", column.label), label_width),
                    value: flatten(value),
                })
                .collect(),
        })
        .collect();

    let data = CardsData {
        cards,
        footer: footer(listing),
    };
    render_template(CARDS_TEMPLATE, &data, use_color)
}

/// Result summary, plus the page position when there is more than one page.
fn footer(listing: &Listing) -> String {
    let page = &listing.pagination;
    if page.total_pages > 1 {
        format!(
            "{} · page {} of {}",
            listing.summary(),
            page.current_page,
            page.total_pages
        )
    } else {
        listing.summary()
    }
}

pub fn render_detail(detail: &Detail) -> String {
    render_detail_internal(detail, None)
}

fn render_detail_internal(detail: &Detail, use_color: Option<bool>) -> String {
    let label_width = detail
        .fields
        .iter()
        .map(|f| f.label.width() + 1)
        .max()
        .unwrap_or(0);
    let fields = detail
        .fields
        .iter()
        .map(|f| {
            let label = format!("{}:", f.label);
            DetailFieldData {
                padding: " ".repeat(label_width.saturating_sub(label.width())),
                label,
                value: f.value.clone(),
                translated: f.translated,
            }
        })
        .collect();

    let data = DetailData {
        id: format!("#{}", detail.id),
        title: detail.title.clone(),
        kind: format!("({})", detail.kind.singular().to_lowercase()),
        fields,
        media: detail.media.clone(),
        translated_marker: TRANSLATED_MARKER,
    };
    render_template(DETAIL_TEMPLATE, &data, use_color)
}

pub fn session_lines(session: &Session) -> Vec<String> {
    let user = &session.user;
    let mut lines = vec![format!(
        "{} ({})",
        user.display_name(),
        role_label(session.role())
    )];
    if user.display_name() != user.username {
        lines.push(format!("username: {}", user.username));
    }
    if let Some(email) = user.email.as_deref().filter(|e| !e.is_empty()) {
        lines.push(format!("email: {}", email));
    }
    lines.push(format!(
        "signed in {}",
        format_time_ago(session.started_at).trim()
    ));
    lines
}

pub fn route_lines(report: &RouteReport) -> Vec<String> {
    let mut lines = vec![format!("{} -> {}", report.route, report.decision.describe())];
    let nav: Vec<String> = report
        .nav
        .iter()
        .map(|item| format!("{} ({})", item.label, item.path))
        .collect();
    lines.push(format!("nav: {}", nav.join(", ")));
    lines
}

pub fn render_text_list(lines: &[String], empty_message: &str) -> String {
    render_text_list_internal(lines, empty_message, None)
}

fn render_text_list_internal(
    lines: &[String],
    empty_message: &str,
    use_color: Option<bool>,
) -> String {
    let data = TextListData {
        lines: lines.to_vec(),
        empty_message: empty_message.to_string(),
    };
    match use_color {
        Some(c) => render_with_color(
            TEXT_LIST_TEMPLATE,
            &data,
            ThemeChoice::from(&*KUTTI_THEME),
            c,
        ),
        None => render(TEXT_LIST_TEMPLATE, &data, ThemeChoice::from(&*KUTTI_THEME)),
    }
    .unwrap_or_else(|_| format!("{}\n", empty_message))
}

/// Renders command messages using the template system with themed styles.
pub fn render_messages(messages: &[CmdMessage]) -> String {
    render_messages_internal(messages, None)
}

fn render_messages_internal(messages: &[CmdMessage], use_color: Option<bool>) -> String {
    if messages.is_empty() {
        return String::new();
    }

    let data = MessagesData {
        messages: messages
            .iter()
            .map(|msg| MessageData {
                content: msg.content.clone(),
                style: match msg.level {
                    MessageLevel::Info => names::INFO,
                    MessageLevel::Success => names::SUCCESS,
                    MessageLevel::Warning => names::WARNING,
                    MessageLevel::Error => names::ERROR,
                }
                .to_string(),
            })
            .collect(),
    };

    let rendered = match use_color {
        Some(c) => render_with_color(MESSAGES_TEMPLATE, &data, ThemeChoice::from(&*KUTTI_THEME), c),
        None => render(MESSAGES_TEMPLATE, &data, ThemeChoice::from(&*KUTTI_THEME)),
    };
    rendered.unwrap_or_else(|_| {
        messages
            .iter()
            .map(|m| format!("{}\n", m.content))
            .collect()
    })
}

/// Writes rendered output to stdout, ending it with exactly one newline.
pub fn emit(output: &str) {
    if output.is_empty() {
        return;
    }
    if output.ends_with('\n') {
        print!("{}", output);
    } else {
        println!("{}", output);
    }
}

pub fn print_messages(messages: &[CmdMessage]) {
    emit(&render_messages(messages));
}

/// Cells are single-line in a table.
fn flatten(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn pad(text: &str, width: usize) -> String {
    let text = truncate_to_width(text, width);
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

fn layout_line(cells: &[&str], widths: &[usize]) -> String {
    let last = widths.len().saturating_sub(1);
    cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, width))| {
            let cell = flatten(cell);
            if i == last {
                truncate_to_width(&cell, *width)
            } else {
                pad(&cell, *width)
            }
        })
        .collect::<Vec<_>>()
        .join(COLUMN_GAP)
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthChar;

    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;
    let limit = max_width.saturating_sub(1);

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > limit {
            break;
        }
        result.push(c);
        current_width += char_width;
    }
    result.push('…');
    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let formatter = timeago::Formatter::new();
    formatter.convert(duration.to_std().unwrap_or_default())
}
