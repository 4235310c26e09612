mod catalog;
mod sessions;

pub use catalog::Catalog;
pub use sessions::SessionStore;
