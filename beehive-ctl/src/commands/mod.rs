//! Command handlers for the beehive CLI (§6 CLI surface).
//!
//! Each module handles one subcommand, delegating to the workspace crates
//! for all actual coordination-substrate logic.

pub(crate) mod attach;
pub(crate) mod daemon;
pub(crate) mod init;
pub(crate) mod inject_roles;
pub(crate) mod logs;
pub(crate) mod remind;
pub(crate) mod start_task;
pub(crate) mod status;
pub(crate) mod stop;
pub(crate) mod task;

pub(crate) use attach::handle_attach;
pub(crate) use daemon::handle_daemon_command;
pub(crate) use init::handle_init;
pub(crate) use inject_roles::handle_inject_roles;
pub(crate) use logs::handle_logs;
pub(crate) use remind::handle_remind;
pub(crate) use start_task::handle_start_task;
pub(crate) use status::handle_status;
pub(crate) use stop::handle_stop;
pub(crate) use task::handle_task_command;
