pub mod error;
pub mod lua;
pub mod options;
mod pin_registry;
mod stack;
mod table;
pub mod thread;
mod user_data;
mod warnings;
