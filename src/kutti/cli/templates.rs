//! Minijinja templates for terminal output, styled through the `style`
//! filter with the names in [`super::styles::names`].

pub const LIST_TEMPLATE: &str = include_str!("templates/list.tmp");
pub const CARDS_TEMPLATE: &str = include_str!("templates/cards.tmp");
pub const DETAIL_TEMPLATE: &str = include_str!("templates/detail.tmp");
pub const TEXT_LIST_TEMPLATE: &str = include_str!("templates/text_list.tmp");
pub const MESSAGES_TEMPLATE: &str = include_str!("templates/messages.tmp");
