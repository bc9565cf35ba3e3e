mod backoff;
mod decoder;

pub use backoff::Backoff;
pub use decoder::Decoder;
