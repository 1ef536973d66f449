//! Command handlers grouped by concern.

mod add;
mod connect;
mod list;
mod plugins;
mod validate;

pub(crate) use add::handle_add;
pub(crate) use connect::handle_connect;
pub(crate) use list::handle_list;
pub(crate) use plugins::handle_plugins;
pub(crate) use validate::handle_validate;
