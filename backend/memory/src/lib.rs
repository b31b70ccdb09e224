pub mod error;
pub mod manager;
pub mod store;
pub mod supabase;
pub mod types;
pub mod uuid_format;

pub use error::MemoryError;
pub use manager::{TawjihiMemory, DEFAULT_HISTORY_LIMIT};
pub use store::{InMemoryStore, MemoryStore};
pub use supabase::SupabaseStore;
pub use types::{
    Conversation, NewConversation, NewMessage, NewStudySession, NewSubject, StoredMessage,
    StudySession, SubjectRecord,
};
pub use uuid_format::ensure_uuid_format;
