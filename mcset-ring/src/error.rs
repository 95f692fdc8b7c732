use thiserror::Error;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum RingError {
    #[error("The hash ring has no members to select from.")]
    /// A lookup was attempted against an empty ring.
    NoMembers,
}
