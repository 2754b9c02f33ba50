pub mod common;
pub mod fildes;
pub mod generic;
pub mod path;
pub mod socket;
