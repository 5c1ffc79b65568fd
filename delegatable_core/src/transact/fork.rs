//! Checkpoint copies of engine state.

/// Synchronously fork a data structure.
pub trait Fork {
    /// The forked variant of the data structure.
    type Forked;

    /// Fork the data structure.
    ///
    /// This may often be implemented with `Clone`, but trait objects
    /// (such as boxed targets) need their own deep copy.
    fn fork(&self) -> Self::Forked;
}
