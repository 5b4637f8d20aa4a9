pub mod document;
pub mod error;
pub mod messages;
pub mod status;

pub use document::*;
pub use error::*;
pub use messages::*;
pub use status::*;
