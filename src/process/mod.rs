// ABOUTME: Child process supervision and the log follower seam
//
// - supervisor: spawn / status / terminate for one OS process
// - follower: LogFollower trait and the child-process implementation
// - scripted: in-memory follower replaying a script of lines

pub mod follower;
pub mod scripted;
pub mod supervisor;

pub use follower::{render_command_line, ChildLogFollower, LogFollower, LogStream};
pub use scripted::{FollowerProbe, LogScript, ScriptedFollower};
pub use supervisor::{ProcessState, ProcessSupervisor, SupervisorError};
