//! Property tests against a reference oracle.

mod property {
    pub mod format;
    pub mod invariants;
    pub mod oracles;
}
