//! SQLite-backed session store
//!
//! Production implementation of the `SessionStore` trait: one SQLite
//! database in WAL mode holding every session record, with a versioned
//! schema checked at open.

mod sqlite_store;

pub use sqlite_store::SqliteSessionStore;
