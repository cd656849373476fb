pub mod codec;
pub mod merge;

pub use codec::{DecodeError, FORMAT_VERSION, Snapshot, decode, encode};
pub use merge::{MergeOutcome, merge, merge_detailed};
