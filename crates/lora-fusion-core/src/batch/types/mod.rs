//! Request, queue and batch types for the signature scheduler.

mod batch;
mod queue;
mod request;

pub use batch::Batch;
pub use queue::SignatureQueue;
pub use request::GenerationRequest;
