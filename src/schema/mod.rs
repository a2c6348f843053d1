pub mod category;
pub mod condition;
pub mod phrase;
