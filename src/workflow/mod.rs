pub mod retry;
pub mod verification_ctx;
pub mod verification_flow;

pub use retry::{FailureReason, RetryPolicy};
pub use verification_ctx::VerificationCtx;
pub use verification_flow::{VerificationFailure, VerificationFlow};
