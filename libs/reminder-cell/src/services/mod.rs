pub mod dispatch;
pub mod retention;
pub mod sweeper;
