pub mod request;
pub mod response;

pub use request::ClientRequest;
pub use response::{FieldValue, InboundMessage};
