//! Wire formats served over HTTP
//!
//! Request parsing and response encoding belong to hyper; this module only
//! holds what is specific to the MJPEG stream:
//! - `multipart/x-mixed-replace` part framing
//! - The fixed landing page

pub mod multipart;
pub mod page;

pub use multipart::{encode_part, BOUNDARY, STREAM_CONTENT_TYPE};
pub use page::INDEX_HTML;
