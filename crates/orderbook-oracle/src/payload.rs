use alloy_primitives::{hex, Bytes, B256};
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::error::{OracleError, Result};

#[derive(Debug, Deserialize)]
struct LatestResponse {
    binary: BinaryUpdate,
    #[serde(default)]
    parsed: Vec<RawParsed>,
}

#[derive(Debug, Deserialize)]
struct BinaryUpdate {
    encoding: String,
    data: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawParsed {
    id: String,
    price: RawPrice,
}

#[derive(Debug, Deserialize)]
struct RawPrice {
    price: String,
    conf: String,
    expo: i32,
    publish_time: i64,
}

/// Price reported alongside the update, as `price * 10^expo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPrice {
    pub id: B256,
    pub price: i64,
    pub conf: u64,
    pub expo: i32,
    pub publish_time: i64,
}

/// Signed update blobs ready to pass as `bytes[] priceUpdateData`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceUpdate {
    pub data: Vec<Bytes>,
    pub prices: Vec<ParsedPrice>,
}

impl PriceUpdate {
    /// Hex form of every blob, for display
    pub fn to_hex(&self) -> Vec<String> {
        self.data.iter().map(|blob| hex::encode_prefixed(blob)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn decode_err(e: impl std::fmt::Display) -> OracleError {
    OracleError::Decode(e.to_string())
}

/// Decode a `latest price updates` response body
pub fn decode_payload(body: &str) -> Result<PriceUpdate> {
    let response: LatestResponse = serde_json::from_str(body).map_err(decode_err)?;
    if response.binary.encoding != "base64" {
        return Err(OracleError::Decode(format!(
            "unexpected encoding {}",
            response.binary.encoding
        )));
    }

    let data = response
        .binary
        .data
        .iter()
        .map(|blob| BASE64_STANDARD.decode(blob).map(Bytes::from).map_err(decode_err))
        .collect::<Result<Vec<_>>>()?;

    let prices = response
        .parsed
        .into_iter()
        .map(|p| {
            Ok(ParsedPrice {
                id: normalize_feed_id(&p.id).parse().map_err(decode_err)?,
                price: p.price.price.parse().map_err(decode_err)?,
                conf: p.price.conf.parse().map_err(decode_err)?,
                expo: p.price.expo,
                publish_time: p.price.publish_time,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PriceUpdate { data, prices })
}

/// Feed ids may come back without a `0x` prefix
pub(crate) fn normalize_feed_id(id: &str) -> String {
    if id.starts_with("0x") {
        id.to_string()
    } else {
        format!("0x{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = "ff61491a931112ddf1bd8147cd1b641375f79f5825126d665480874634fd0ace";

    #[test]
    fn test_decode_payload() {
        let body = format!(
            r#"{{
                "binary": {{"encoding": "base64", "data": ["3q2+7w==", "AQID"]}},
                "parsed": [{{
                    "id": "{FEED}",
                    "price": {{"price": "312345000000", "conf": "150000000", "expo": -8, "publish_time": 1700000000}},
                    "ema_price": {{"price": "312000000000", "conf": "140000000", "expo": -8, "publish_time": 1700000000}}
                }}]
            }}"#
        );
        let update = decode_payload(&body).unwrap();

        assert_eq!(update.data.len(), 2);
        assert_eq!(update.to_hex(), vec!["0xdeadbeef".to_string(), "0x010203".to_string()]);
        assert_eq!(update.prices.len(), 1);
        assert_eq!(update.prices[0].price, 312_345_000_000);
        assert_eq!(update.prices[0].expo, -8);
        assert_eq!(
            update.prices[0].id,
            format!("0x{FEED}").parse::<B256>().unwrap()
        );
    }

    #[test]
    fn test_parsed_section_is_optional() {
        let update = decode_payload(r#"{"binary": {"encoding": "base64", "data": []}}"#).unwrap();
        assert!(update.is_empty());
        assert!(update.prices.is_empty());
    }

    #[test]
    fn test_rejects_bad_payloads() {
        assert!(matches!(
            decode_payload(r#"{"binary": {"encoding": "hex", "data": ["00"]}}"#),
            Err(OracleError::Decode(_))
        ));
        assert!(matches!(
            decode_payload(r#"{"binary": {"encoding": "base64", "data": ["not base64!"]}}"#),
            Err(OracleError::Decode(_))
        ));
        assert!(decode_payload("not json").is_err());
    }
}
