use {
    alloy::primitives::I256,
    serde::{
        Deserializer,
        Serializer,
        de::{self, Visitor},
    },
    serde_with::{DeserializeAs, SerializeAs},
    std::fmt,
};

/// Writes [`I256`] as a decimal string and reads it from a decimal string or
/// a JSON integer. Negative values are accepted so callers can reject them
/// with their own errors.
pub struct DecimalI256;

struct DecimalVisitor;

impl DecimalVisitor {
    fn integer<E: de::Error>(value: i128) -> Result<I256, E> {
        I256::try_from(value).map_err(E::custom)
    }
}

impl Visitor<'_> for DecimalVisitor {
    type Value = I256;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a decimal string or an integer")
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<I256, E> {
        I256::from_dec_str(s.trim()).map_err(|err| E::custom(format!("{s:?} is not a decimal: {err}")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<I256, E> {
        Self::integer(v.into())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<I256, E> {
        Self::integer(v.into())
    }
}

impl<'de> DeserializeAs<'de, I256> for DecimalI256 {
    fn deserialize_as<D: Deserializer<'de>>(deserializer: D) -> Result<I256, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }
}

impl SerializeAs<I256> for DecimalI256 {
    fn serialize_as<S: Serializer>(source: &I256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(source)
    }
}
