// Incremental poll sync: fingerprint each response section, serve only what changed.

mod detector;
mod digest_store;
mod fingerprint;
pub mod poll;

pub use detector::{ChangeDetector, has_news};
pub use digest_store::{DigestStore, MemoryDigestStore, SectionDigest};
pub use fingerprint::{Fingerprint, FingerprintError, fingerprint};
pub use poll::{PollRequest, PollResponse, PollService, Section};
