//! Chat turn handling: bounded conversation memory, the intent router, and
//! the tool dispatch entry point.

pub mod dispatch;
pub mod handlers;
pub mod memory;
pub mod prompts;
pub mod router;
pub mod stream;
