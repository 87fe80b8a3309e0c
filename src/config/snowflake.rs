//! Serde helpers for Discord ids and colours in the config document.
//!
//! Ids are written as decimal strings so the browser panel never loses
//! precision. They are read leniently: strings, integers, `null` and `""`
//! are all accepted, and `0` / `""` mean "not set".

use serde::de::{self, Deserializer, Visitor};
use serde::Serializer;
use std::fmt;

pub fn serialize<S>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(id) => serializer.collect_str(id),
        None => serializer.serialize_none(),
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(OptionalIdVisitor)
}

/// Serialize a required id as a decimal string.
pub fn serialize_id<S>(id: &u64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(id)
}

/// Parse an id typed by a human or sent by the panel.
pub fn parse_id(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|id| *id != 0)
}

struct OptionalIdVisitor;

impl<'de> Visitor<'de> for OptionalIdVisitor {
    type Value = Option<u64>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a Discord id as a decimal string or integer, or null")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
        d.deserialize_any(self)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(v).filter(|id| *id != 0))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map(|id| Some(id).filter(|id| *id != 0))
            .map_err(|_| E::custom(format!("negative id {v}")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        // Integral floats below 2^53 were not rounded on the way in.
        if v.fract() == 0.0 && v >= 0.0 && v < 9_007_199_254_740_992.0 {
            Ok(Some(v as u64).filter(|id| *id != 0))
        } else {
            Err(E::custom(format!("{v} is not a usable id")))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        trimmed
            .parse::<u64>()
            .map(|id| Some(id).filter(|id| *id != 0))
            .map_err(|_| E::custom(format!("'{v}' is not a numeric id")))
    }
}

/// Colour as integer on disk; integer or `#RRGGBB` accepted on read.
pub mod colour {
    use super::*;

    pub fn serialize<S>(value: &u32, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(*value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ColourVisitor)
    }

    pub fn parse_hex(raw: &str) -> Option<u32> {
        let hex = raw.trim().trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        u32::from_str_radix(hex, 16).ok()
    }

    struct ColourVisitor;

    impl<'de> Visitor<'de> for ColourVisitor {
        type Value = u32;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a colour as an integer or #RRGGBB string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u32, E> {
            if v <= 0xFF_FF_FF {
                Ok(v as u32)
            } else {
                Err(E::custom(format!("colour {v} out of range")))
            }
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u32, E> {
            u64::try_from(v)
                .map_err(|_| E::custom(format!("colour {v} out of range")))
                .and_then(|v| self.visit_u64(v))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u32, E> {
            parse_hex(v).ok_or_else(|| E::custom(format!("'{v}' is not a #RRGGBB colour")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Holder {
        #[serde(with = "super", default)]
        id: Option<u64>,
    }

    fn read(json: &str) -> Option<u64> {
        serde_json::from_str::<Holder>(json).unwrap().id
    }

    #[test]
    fn test_reads_strings_numbers_and_blanks() {
        assert_eq!(read(r#"{"id": "1234567890123456789"}"#), Some(1234567890123456789));
        assert_eq!(read(r#"{"id": 42}"#), Some(42));
        assert_eq!(read(r#"{"id": null}"#), None);
        assert_eq!(read(r#"{"id": ""}"#), None);
        assert_eq!(read(r#"{"id": "0"}"#), None);
        assert_eq!(read(r#"{}"#), None);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(serde_json::from_str::<Holder>(r#"{"id": "abc"}"#).is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"id": -5}"#).is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"id": true}"#).is_err());
    }

    #[test]
    fn test_writes_decimal_string() {
        let json = serde_json::to_string(&Holder {
            id: Some(1234567890123456789),
        })
        .unwrap();
        assert_eq!(json, r#"{"id":"1234567890123456789"}"#);
        let json = serde_json::to_string(&Holder { id: None }).unwrap();
        assert_eq!(json, r#"{"id":null}"#);
    }

    #[test]
    fn test_parse_hex_colour() {
        assert_eq!(colour::parse_hex("#5865F2"), Some(0x5865F2));
        assert_eq!(colour::parse_hex("2ecc71"), Some(0x2ecc71));
        assert_eq!(colour::parse_hex("#fff"), None);
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id(" 100 "), Some(100));
        assert_eq!(parse_id("0"), None);
        assert_eq!(parse_id("12a"), None);
    }
}
