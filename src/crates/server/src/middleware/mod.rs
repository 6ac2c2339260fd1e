pub mod access;

pub use access::{guest_only, AccessDenied, CurrentUser, RequireType};
