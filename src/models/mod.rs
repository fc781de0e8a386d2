pub mod courier;
pub mod events;
pub mod page;
