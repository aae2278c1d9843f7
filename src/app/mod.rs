//! Application runtime composition modules.

pub(crate) mod progress_ui;
pub(crate) mod runtime;
pub(crate) mod terminal;
