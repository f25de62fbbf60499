// Server module entry point
// Listener setup, connection handling and the accept loop

pub mod connection;
pub mod listener;
pub mod service;
pub mod signal;

// `loop` is a keyword, so the module is named server_loop
#[path = "loop.rs"]
pub mod server_loop;

pub use listener::create_reusable_listener;
pub use server_loop::start_server_loop;
pub use signal::start_signal_handler;
