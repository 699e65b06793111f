//! Coordinate assignment: deterministic names and version decisions

use sha2::{Digest, Sha256};

use super::SecretCoordinate;
use crate::schema::SecretPath;
use crate::types::EntityIdentity;

/// Hex characters of the path digest kept in a coordinate name
const PATH_DIGEST_LEN: usize = 16;

/// Outcome of assigning a coordinate to a secret leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// The previous coordinate already holds this plaintext; nothing to write
    Reused(SecretCoordinate),
    /// A new coordinate that must be written before it is referenced
    Fresh(SecretCoordinate),
}

impl Assignment {
    pub fn coordinate(&self) -> &SecretCoordinate {
        match self {
            Assignment::Reused(coordinate) | Assignment::Fresh(coordinate) => coordinate,
        }
    }

    pub fn requires_write(&self) -> bool {
        matches!(self, Assignment::Fresh(_))
    }

    pub fn into_coordinate(self) -> SecretCoordinate {
        match self {
            Assignment::Reused(coordinate) | Assignment::Fresh(coordinate) => coordinate,
        }
    }
}

/// Derive the coordinate name for a secret leaf
///
/// `<kind prefix>_<entity id>_secret_<path digest>`, where the digest is the
/// leading hex of SHA-256 over the rendered path. Pure: the same inputs always
/// give the same name, and distinct entities or paths give distinct names.
pub fn derive_name(identity: &EntityIdentity, path: &SecretPath) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string().as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    format!(
        "{}_{}_secret_{}",
        identity.kind.coordinate_prefix(),
        identity.id,
        &digest[..PATH_DIGEST_LEN]
    )
}

/// Decide the coordinate for `plaintext` at `identity` + `path`
///
/// - no previous coordinate: version 1 of the derived name
/// - previous coordinate whose stored value equals `plaintext`: reused
/// - otherwise (different or missing value): previous name, next version
///
/// `lookup` reads the value currently stored at the previous coordinate. It
/// is consulted on every call; nothing is cached between assignments.
pub fn assign<F>(
    identity: &EntityIdentity,
    path: &SecretPath,
    plaintext: &str,
    previous: Option<&SecretCoordinate>,
    lookup: F,
) -> Assignment
where
    F: FnOnce(&SecretCoordinate) -> Option<String>,
{
    match previous {
        None => Assignment::Fresh(SecretCoordinate::new(derive_name(identity, path), 1)),
        Some(previous) => match lookup(previous) {
            Some(stored) if stored == plaintext => Assignment::Reused(previous.clone()),
            _ => Assignment::Fresh(previous.next_version()),
        },
    }
}
