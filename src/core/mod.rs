//! Process-wide lifecycle state.

mod state;

pub use state::{fail, is_shutdown, register_server, setup_shutdown_handler, take_failure};
