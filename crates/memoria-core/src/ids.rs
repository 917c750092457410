//! Sortable identifier generation (component B).
//!
//! Card, tag, revision, and audit identifiers are [ULIDs](https://github.com/ulid/spec):
//! a 128-bit value rendered as a 26-character Crockford base-32 string whose
//! lexical order matches creation order, even for two identifiers minted in
//! the same millisecond (the random payload still makes ties vanishingly
//! unlikely, and ties don't violate invariant 1 — identifiers are never reused).

use ulid::Ulid;

/// Mint a new sortable identifier.
pub fn new_id() -> String {
    Ulid::new().to_string()
}
