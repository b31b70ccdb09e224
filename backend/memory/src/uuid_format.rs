//! User id coercion.
//!
//! The hosted schema types `user_id` as UUID while clients send free-form
//! usernames. Every id is mapped to a UUID before it reaches a query.

use std::sync::LazyLock;

use uuid::Uuid;

/// Namespace for name-based ids: v5(DNS, "tawjihi.ai").
static APP_NAMESPACE: LazyLock<Uuid> =
    LazyLock::new(|| Uuid::new_v5(&Uuid::NAMESPACE_DNS, b"tawjihi.ai"));

/// Return `id` in a form the `user_id` columns accept.
///
/// Strings that already parse as UUIDs come back unchanged, in whatever
/// form the caller sent; anything else maps to a stable v5 UUID.
pub fn ensure_uuid_format(id: &str) -> String {
    match Uuid::parse_str(id) {
        Ok(_) => id.to_string(),
        Err(_) => Uuid::new_v5(&APP_NAMESPACE, id.as_bytes())
            .hyphenated()
            .to_string(),
    }
}
