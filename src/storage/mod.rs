pub mod phrase_store;
pub mod registry;
pub mod sanitize;
pub mod selector;
