mod concurrent_transitions;
mod indexer_sync;
mod membership_flow;
mod proposal_flow;
mod session_storage;
