//! Test execution reporting protocol.
//!
//! The runner side renders lifecycle [`Event`]s as single escaped lines:
//!
//! ```text
//! @@<TestRunner-{"name":"testStarted", "type":"Info", "attributes":{"name":"add", "location":"java:test://pkg.Calc.add"}}-TestRunner>
//! ```
//!
//! The client side extracts those frames from arbitrary output with
//! [`FrameDecoder`] and folds them into per-test outcomes with
//! [`ResultAnalyzer`].

mod analyzer;
mod decode;
pub mod emitter;
mod escape;
mod event;

pub use analyzer::{ResultAnalyzer, TestOutcome, TestResult, TestStatus};
pub use decode::{decode_frame, decode_frames, DecodedEvent, FrameDecoder, FrameError};
pub use emitter::{FailureCause, RunSummary, TestDescription, TestFailure, TestReporter};
pub use escape::{escape, restore_at_signs, AT_SIGN_ENTITY};
pub use event::{Event, MessageType};
