//! Wire payloads for the collector's update endpoints.
//!
//! A batch is a JSON array of [`MetricPayload`]s, optionally gzip-compressed
//! in transit (`Content-Encoding: gzip`) and optionally carrying per-item
//! integrity tags when a signing key is configured.

use crate::sign;
use crate::types::{MetricKind, MetricSample, MetricValue, TYPE_COUNTER, TYPE_GAUGE};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Errors turning a wire payload into a domain sample.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// `value` missing on a gauge or `delta` missing on a counter.
    #[error("metric value should not be empty")]
    MissingValue,

    /// The `type` field names no known metric kind.
    #[error("unknown metric type: {0}")]
    UnknownKind(String),

    /// The integrity tag does not match the received fields.
    #[error("hash check failed for {0} metric")]
    HashMismatch(MetricKind),

    /// The body is not valid JSON for the expected shape.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

/// One element of the batch body, or the body of a single update.
///
/// `type` stays a plain string on the wire so receivers can answer an
/// unknown kind with the endpoint's status code instead of failing the
/// whole parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl MetricPayload {
    /// Builds the outbound payload, attaching an integrity tag when a
    /// signing key is configured.
    pub fn from_sample(sample: &MetricSample, key: Option<&str>) -> Self {
        let mut payload = match sample.value {
            MetricValue::Gauge(value) => Self {
                id: sample.name.clone(),
                kind: TYPE_GAUGE.to_string(),
                value: Some(value),
                ..Default::default()
            },
            MetricValue::Counter(delta) => Self {
                id: sample.name.clone(),
                kind: TYPE_COUNTER.to_string(),
                delta: Some(delta),
                ..Default::default()
            },
        };
        if let Some(key) = key {
            payload.hash = Some(match sample.value {
                MetricValue::Gauge(value) => sign::gauge_hash(key, &sample.name, value),
                MetricValue::Counter(delta) => sign::counter_hash(key, &sample.name, delta),
            });
        }
        payload
    }

    pub fn metric_kind(&self) -> Result<MetricKind, WireError> {
        self.kind
            .parse()
            .map_err(|_| WireError::UnknownKind(self.kind.clone()))
    }

    /// Validates the mandatory kind-specific field and returns the sample.
    pub fn to_sample(&self) -> Result<MetricSample, WireError> {
        match self.metric_kind()? {
            MetricKind::Gauge => {
                let value = self.value.ok_or(WireError::MissingValue)?;
                Ok(MetricSample::gauge(self.id.clone(), value))
            }
            MetricKind::Counter => {
                let delta = self.delta.ok_or(WireError::MissingValue)?;
                Ok(MetricSample::counter(self.id.clone(), delta))
            }
        }
    }

    /// Recomputes the integrity tag over the received fields.
    ///
    /// No key configured, or no incoming hash, passes without verification;
    /// the non-strict acceptance is part of the protocol.
    pub fn verify_hash(&self, key: Option<&str>) -> Result<(), WireError> {
        let (Some(key), Some(hash)) = (key, self.hash.as_deref()) else {
            return Ok(());
        };
        let kind = self.metric_kind()?;
        let expected = match kind {
            MetricKind::Gauge => {
                sign::gauge_hash(key, &self.id, self.value.ok_or(WireError::MissingValue)?)
            }
            MetricKind::Counter => {
                sign::counter_hash(key, &self.id, self.delta.ok_or(WireError::MissingValue)?)
            }
        };
        if expected != hash {
            return Err(WireError::HashMismatch(kind));
        }
        Ok(())
    }
}

/// Serializes a batch as the `/updates/` JSON body, signing each item when
/// a key is configured.
pub fn encode_batch(samples: &[MetricSample], key: Option<&str>) -> Result<Vec<u8>, WireError> {
    let payloads: Vec<MetricPayload> = samples
        .iter()
        .map(|sample| MetricPayload::from_sample(sample, key))
        .collect();
    Ok(serde_json::to_vec(&payloads)?)
}

pub fn decode_batch(bytes: &[u8]) -> Result<Vec<MetricPayload>, WireError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Gzip at best compression, paired with `Content-Encoding: gzip`.
pub fn compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    encoder.finish()
}

pub fn decompress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_round_trip_preserves_samples() {
        let samples = vec![
            MetricSample::gauge("Alloc", 65637.019),
            MetricSample::counter("PollCount", 3),
            MetricSample::counter("PollCount", 3),
        ];
        let bytes = encode_batch(&samples, None).unwrap();
        let decoded: Vec<MetricSample> = decode_batch(&bytes)
            .unwrap()
            .iter()
            .map(|p| p.to_sample().unwrap())
            .collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn mandatory_field_is_enforced() {
        let payload = MetricPayload {
            id: "PollCount".to_string(),
            kind: "counter".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            payload.to_sample(),
            Err(WireError::MissingValue)
        ));

        let payload = MetricPayload {
            id: "x".to_string(),
            kind: "histogram".to_string(),
            ..Default::default()
        };
        assert!(matches!(payload.to_sample(), Err(WireError::UnknownKind(_))));
    }

    #[test]
    fn value_and_delta_stay_kind_specific_on_the_wire() {
        let bytes = encode_batch(&[MetricSample::gauge("g", 1.5)], None).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json[0]["value"], 1.5);
        assert!(json[0].get("delta").is_none());
        assert!(json[0].get("hash").is_none());
    }

    #[test]
    fn tampered_value_fails_verification() {
        let sample = MetricSample::gauge("Alloc", 1.0);
        let mut payload = MetricPayload::from_sample(&sample, Some("secret"));
        assert!(payload.verify_hash(Some("secret")).is_ok());

        payload.value = Some(2.0);
        assert!(matches!(
            payload.verify_hash(Some("secret")),
            Err(WireError::HashMismatch(MetricKind::Gauge))
        ));
    }

    #[test]
    fn verification_is_non_strict() {
        let unsigned = MetricPayload::from_sample(&MetricSample::counter("c", 1), None);
        // Key configured but no incoming hash: accepted without verification.
        assert!(unsigned.verify_hash(Some("secret")).is_ok());
        // No key configured: the hash is not checked at all.
        let mut signed = MetricPayload::from_sample(&MetricSample::counter("c", 1), Some("k"));
        signed.delta = Some(99);
        assert!(signed.verify_hash(None).is_ok());
    }

    #[test]
    fn gzip_round_trip() {
        let body = encode_batch(&[MetricSample::gauge("g", 1.5)], None).unwrap();
        let packed = compress(&body).unwrap();
        assert_eq!(decompress(&packed).unwrap(), body);
    }
}
