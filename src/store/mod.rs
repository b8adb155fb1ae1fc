pub mod blob;
pub mod postgres;

pub use blob::BlobStore;
pub use postgres::{Admission, PgStore};
