//! # mcset Ring
//! A consistent hash ring mapping arbitrary keys onto a set of opaque member identifiers.
//!
//! Each member is placed on a `u32` ring at a number of positions (virtual nodes) derived
//! from the IEEE CRC-32 of the replica index and the member identifier. A key is owned by
//! the member holding the first position at or after the key's own hash, wrapping around
//! to the start of the ring.
//!
//! The hash function is unseeded, so the same membership and key always produce the same
//! owner, including across process restarts. Adding or removing a single member only moves
//! the keys owned by that member.
//!
//! ```rust
//! use mcset_ring::HashRing;
//!
//! let mut ring = HashRing::new();
//! ring.set_members(["10.0.0.1:11211", "10.0.0.2:11211", "10.0.0.3:11211"]);
//!
//! let owner = ring.get("session:1234").expect("Ring has members");
//! assert!(ring.contains(owner));
//! ```

mod error;

use std::collections::{BTreeMap, BTreeSet};

pub use error::RingError;

/// The default number of virtual nodes each member is given on the ring.
pub const DEFAULT_REPLICAS: usize = 160;

#[derive(Debug, Clone)]
pub struct HashRing {
    replicas: usize,
    /// The sorted, de-duplicated membership.
    members: Vec<String>,
    /// Ring position -> index into `members`.
    positions: BTreeMap<u32, usize>,
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new()
    }
}

impl HashRing {
    /// Creates a new empty ring using [DEFAULT_REPLICAS] virtual nodes per member.
    pub fn new() -> Self {
        Self::with_replicas(DEFAULT_REPLICAS)
    }

    /// Creates a new empty ring with `replicas` virtual nodes per member.
    ///
    /// At least one position is always used per member.
    pub fn with_replicas(replicas: usize) -> Self {
        Self {
            replicas: replicas.max(1),
            members: Vec::new(),
            positions: BTreeMap::new(),
        }
    }

    #[inline]
    /// The number of virtual nodes each member is given.
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    #[inline]
    /// The number of distinct members in the ring.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns if the given member is part of the ring.
    pub fn contains(&self, member: &str) -> bool {
        self.members
            .binary_search_by(|probe| probe.as_str().cmp(member))
            .is_ok()
    }

    /// Replaces the full membership of the ring.
    ///
    /// Duplicate identifiers are collapsed into a single member and empty
    /// identifiers are ignored. Each call completely supersedes the previous
    /// membership.
    pub fn set_members(&mut self, members: impl IntoIterator<Item = impl AsRef<str>>) {
        let members = members
            .into_iter()
            .map(|member| member.as_ref().to_string())
            .filter(|member| !member.is_empty())
            .collect::<BTreeSet<_>>();

        self.members = members.into_iter().collect();
        self.positions.clear();

        // Members are inserted in sorted order so position collisions always
        // resolve to the same owner regardless of the caller's ordering.
        for (idx, member) in self.members.iter().enumerate() {
            for replica in 0..self.replicas {
                self.positions.insert(replica_position(replica, member), idx);
            }
        }
    }

    /// Returns the current membership, sorted.
    pub fn members(&self) -> Vec<String> {
        self.members.clone()
    }

    /// Gets an iterator over the current membership in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    /// Maps the given key to the member which owns it.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<&str, RingError> {
        let hash = crc32fast::hash(key.as_ref());
        let idx = self
            .positions
            .range(hash..)
            .next()
            .or_else(|| self.positions.iter().next())
            .map(|(_, idx)| *idx)
            .ok_or(RingError::NoMembers)?;

        Ok(self.members[idx].as_str())
    }

    /// Gets up to `n` distinct members for the given key.
    ///
    /// The members are returned in ring order starting at the key's owner, which
    /// makes the list the preferred failover order for the key.
    pub fn get_n(&self, key: impl AsRef<[u8]>, n: usize) -> Result<Vec<&str>, RingError> {
        if self.is_empty() {
            return Err(RingError::NoMembers);
        }

        let n = n.min(self.members.len());
        let hash = crc32fast::hash(key.as_ref());

        let mut seen = vec![false; self.members.len()];
        let mut selected = Vec::with_capacity(n);
        let walk = self
            .positions
            .range(hash..)
            .chain(self.positions.range(..hash));
        for (_, &idx) in walk {
            if selected.len() >= n {
                break;
            }

            if !seen[idx] {
                seen[idx] = true;
                selected.push(self.members[idx].as_str());
            }
        }

        Ok(selected)
    }
}

#[inline]
fn replica_position(replica: usize, member: &str) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(replica.to_string().as_bytes());
    hasher.update(member.as_bytes());
    hasher.finalize()
}
