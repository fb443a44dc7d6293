pub mod channel_handlers;
pub mod log_handlers;
pub mod project_handlers;
