//! Payload envelope: the single wire shape for request and response bodies.
//!
//! Every body crossing the process boundary is `{"data": "<ciphertext>"}`.
//! [`codec::EnvelopeCodec`] owns the symmetric key and the
//! encrypt/decrypt pair; [`respond`] owns the only functions that write
//! bodies to the wire, so plaintext never leaves the process.

pub mod codec;
pub mod respond;

pub use codec::{Envelope, EnvelopeCodec};
