pub mod config;
pub mod context;
pub mod pipeline;
pub mod substitution;
pub mod template;
