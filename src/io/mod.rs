// Process-level plumbing
pub mod instance; // Locating and signalling the running daemon
pub mod lock; // Single-instance lock file
pub mod signals; // Unix signal handling
