pub mod messages;
pub mod refresher;
pub mod worker;
