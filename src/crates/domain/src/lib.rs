pub mod user;
pub mod value;
