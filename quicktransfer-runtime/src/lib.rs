pub mod config_store;
pub mod defaults;
pub mod fs;
pub mod history;
pub mod runtime_widget;
