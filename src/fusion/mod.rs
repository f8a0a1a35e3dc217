// Decision fusion: turns lexical and external signals into one verdict.
//
// score.rs holds the pure scoring rules (risk score, category mapping,
// fusion modes). verdict.rs defines the verdict and the envelope handed to
// the transport layer. engine.rs wires scanner, classifier and store together.

pub mod engine;
pub mod score;
pub mod verdict;

pub use engine::{CheckRequest, Moderator, MAX_BATCH_SIZE, MAX_TEXT_CHARS};
pub use score::{compute_risk_score, Category, FusionMode};
pub use verdict::{Action, BatchEntry, CheckOutcome, Decision, FusedVerdict};
