pub mod channel;
pub mod embed;
pub mod message;
