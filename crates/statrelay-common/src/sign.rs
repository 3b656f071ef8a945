//! Tamper-evident integrity tags for wire payloads.
//!
//! A shared key lets the collector detect in-transit modification of a
//! sample's id, kind, or value. The tag covers the string
//! `<id>:<kind>:<rendered value>`; gauges render with six fixed decimals so
//! both sides compute over identical bytes.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// `hex(HMAC-SHA256(key, "<id>:gauge:<value>"))`.
pub fn gauge_hash(key: &str, id: &str, value: f64) -> String {
    tag(key, &format!("{id}:gauge:{value:.6}"))
}

/// `hex(HMAC-SHA256(key, "<id>:counter:<delta>"))`.
pub fn counter_hash(key: &str, id: &str, delta: i64) -> String {
    tag(key, &format!("{id}:counter:{delta}"))
}

fn tag(key: &str, msg: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(msg.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
