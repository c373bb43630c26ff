pub mod supervisor;

pub use supervisor::{LineChannel, ProcessHandle, ProcessSpec, ProcessSupervisor};
