// Sieve: real-time text moderation.
//
// This is the library root. Each module corresponds to one stage of the
// moderation pipeline: terms feed the lexical scanner, the classifier
// module wraps remote signals, fusion combines them into a verdict, and
// the store keeps the violation history.

pub mod classifier;
pub mod config;
pub mod fusion;
pub mod lexical;
pub mod output;
pub mod store;
pub mod terms;
