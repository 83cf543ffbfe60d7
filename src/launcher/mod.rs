pub mod invocation;
pub mod keep_awake;
pub mod runner;

pub use invocation::{build_invocation, DriverInvocation};
pub use keep_awake::{KeepAwake, KeepAwakeStatus, NoKeepAwake, SystemKeepAwake};
pub use runner::{
    exit_code_from_status, install_interrupt_passthrough, launch, resolve_root, DriverProcess,
    LaunchOutcome, LaunchRequest, SystemDriver,
};
