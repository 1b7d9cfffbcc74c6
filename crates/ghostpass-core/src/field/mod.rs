//! Credential fields: sealed username/password pairs

mod codec;
mod envelope;

pub use codec::{decode_pair, encode_pair, DecodedPair};
pub use envelope::Field;
