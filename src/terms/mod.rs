// Restricted terms: the ground truth for lexical matching.
//
// RestrictedTermSet owns the vocabulary and is shared by reference between
// the scanner, the engine and TermDiscovery. Discovery grows the set by
// probing an external classifier with candidate words.

pub mod defaults;
pub mod discovery;
pub mod set;

pub use discovery::TermDiscovery;
pub use set::{RestrictedTermSet, TermSource};
