pub mod quiz;
pub mod watch;
