// External signals: trait-based abstraction for swappable classifiers.
//
// The SignalSource trait defines the interface. ProfanityClient implements
// it against a remote profanity-filter HTTP API. Image classification plugs
// in through ImageSignalSource with the same ExternalResult contract.

pub mod profanity;
pub mod rate_limiter;
pub mod traits;

pub use profanity::ProfanityClient;
pub use rate_limiter::{PacedSource, RateLimiter};
pub use traits::{DisabledSource, ExternalResult, ImageSignalSource, SignalSource};
