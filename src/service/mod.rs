pub mod attendee;
pub mod check_in;
pub mod event;
pub mod log;
pub mod sweeper;
