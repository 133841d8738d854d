//! CLI Exit Code Registry
//!
//! Single source of truth for `sheetsync` exit codes. Schedulers and shell
//! wrappers branch on them, so a code never changes meaning once released.
//!
//! | Code | Meaning                                          |
//! |------|--------------------------------------------------|
//! | 0    | Pass committed (or dry run planned)              |
//! | 1    | General error                                    |
//! | 2    | Usage error (bad arguments)                      |
//! | 3    | Invalid job file or reconciliation config        |
//! | 4    | Ledger header cannot support the pass            |
//! | 5    | Snapshot capture failed                          |
//! | 6    | Ledger read or write failed                      |

use sheetsync_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - the pass committed, or a dry run produced its plan.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure (e.g. cannot write `--output`).
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, no job path resolvable.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Pass (3-6)
// =============================================================================

/// Job file unreadable, malformed, or failing validation.
/// Also raised when the Sheets token variable is unset.
pub const EXIT_INVALID_JOB: u8 = 3;

/// Header row empty, duplicated, or missing an identity or status column.
pub const EXIT_SCHEMA: u8 = 4;

/// Export missing, unreadable, or the table never appeared.
pub const EXIT_CAPTURE: u8 = 5;

/// Ledger read or write failed. Writes before the failure stay applied.
pub const EXIT_STORE_IO: u8 = 6;

/// Map a pass error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::Config(_) => EXIT_INVALID_JOB,
        ReconError::Schema(_) => EXIT_SCHEMA,
        ReconError::Capture(_) => EXIT_CAPTURE,
        ReconError::Store(_) => EXIT_STORE_IO,
    }
}
