//! Globally-unique token identifiers for inventory units.
//!
//! Every minted inventory unit carries a `token_id` that is never reused,
//! even across products and users. The ID embeds its provenance (product,
//! user, mint sequence, mint time) for human debugging and appends a
//! random UUID segment for the uniqueness guarantee itself, which is
//! additionally enforced by a UNIQUE constraint on the column.

use chrono::Utc;

use super::ids::{ProductId, UserId};

/// Derives a fresh token ID for one unit of a purchase.
///
/// `sequence` is the zero-based index of the unit within its purchase,
/// so a quantity-3 purchase mints sequences 0, 1, 2.
#[must_use]
pub fn mint_token_id(product_id: ProductId, user_id: UserId, sequence: i64) -> String {
    let product = product_id.as_uuid().simple().to_string();
    let user = user_id.as_uuid().simple().to_string();
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "JST-{}-{}-{}-{}-{}",
        product.get(..8).unwrap_or_default(),
        user.get(..8).unwrap_or_default(),
        sequence,
        Utc::now().timestamp_millis(),
        nonce.get(..12).unwrap_or_default(),
    )
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn token_ids_are_unique_across_repeated_mints() {
        let product = ProductId::new();
        let user = UserId::new();
        let mut seen = HashSet::new();
        for seq in 0..100 {
            // Same product, user and sequence collide on everything but
            // the nonce.
            assert!(seen.insert(mint_token_id(product, user, seq % 3)));
        }
    }

    #[test]
    fn token_id_embeds_prefix_and_sequence() {
        let id = mint_token_id(ProductId::new(), UserId::new(), 2);
        assert!(id.starts_with("JST-"));
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 6);
        assert_eq!(parts.get(3).copied(), Some("2"));
    }
}
