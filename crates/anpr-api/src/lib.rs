// anpr-api: Async client for the Hikvision ISAPI alert stream

pub mod assembler;
pub mod error;
pub mod isapi;
pub mod stream;

pub use assembler::{Assembled, DiscardReason, PayloadAssembler};
pub use error::Error;
pub use isapi::{AnprDetail, EventNotificationAlert};
pub use stream::{AlertStream, StreamOptions, StreamTarget};
