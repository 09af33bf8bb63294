//! WebRefine request filtering
//!
//! Classifies every subresource request of a page session against the
//! applied rule sets and the permission overlay, accumulates per-page
//! statistics, and exposes the element-hide and inline-script surfaces to
//! the embedder.

mod classifier;
mod refiner;
mod session;

pub use classifier::{FrameContext, InlineScriptVerdict, RequestClassifier, Verdict};
pub use refiner::Refiner;
pub use session::{MatchedUrlInfo, PageInfo, PageSession};
