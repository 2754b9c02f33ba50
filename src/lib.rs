pub mod calls;
pub mod capability;
pub mod causes;
pub mod colors;
pub mod errno_info;
pub mod explanation;
pub mod flags;
pub mod fstrcmp;
pub mod identity;
pub mod options;
pub mod path_resolution;
pub mod permission;
pub mod platform;
pub mod probe;
pub mod render;
pub mod sockaddr;
pub mod string_buffer;
pub mod types;
pub mod wrappers;
pub mod writer;

pub use calls::{explain, explain_errno, explain_errno_into, Call};
pub use string_buffer::StringBuffer;
