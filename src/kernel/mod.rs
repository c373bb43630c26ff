pub mod debounce;
pub mod emotion;
pub mod reactor;
pub mod scheduler;
pub mod time;
