pub mod progress;
pub mod session;
pub mod witness;

pub use progress::{missing_input_owners, progress_for, track_progress, SigningProgress};
pub use session::{SessionState, SigningSession};
pub use witness::{append_witness, extract_witnesses, inspect_witnesses, merge_witnesses, sign_tx_id, verify_witness, MergeOutcome, WitnessCheck};
