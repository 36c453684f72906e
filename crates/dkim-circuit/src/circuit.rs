pub mod base64;
pub mod dkim;
pub mod dynamic_hash;
pub mod misc;
pub mod padded_slice;
pub mod rsa;
