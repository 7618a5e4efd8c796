pub mod pit;
pub mod queue;
pub mod speaker;
pub mod stream;
