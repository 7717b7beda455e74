//env
pub const DATABASE_URL_NOT_SET: &str = "DATABASE_URL not set!";
pub const HOOK_BIND_ADDRESS_INVALID: &str = "Invalid EMBEDDER_BIND_ADDRESS";

//db
pub const DATABASE_CONNECTION_FAILED: &str = "Failed to connect to database";
pub const SCHEMA_SETUP_FAILED: &str = "Failed to prepare embedding schema";

//embeddings
pub const FINGERPRINT_LOOKUP_FAILED: &str = "Failed to look up stored fingerprint";
pub const EMBEDDING_UPSERT_FAILED: &str = "Failed to upsert embedding";
pub const EMBEDDING_DELETE_FAILED: &str = "Failed to delete embeddings";
pub const EMBEDDING_COUNT_FAILED: &str = "Failed to count embeddings";
