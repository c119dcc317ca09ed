use std::fmt;
use std::marker::PhantomData;
use serde::{Deserialize, Serialize, Serializer, Deserializer};
use serde::ser::SerializeMap;
use serde::de::Visitor;

/// Serialize ordered `(key, value)` pairs as a map, keeping their order.
pub fn serialize_fields_as_map<K, S>(fields: &[(K, String)], serializer: S) -> Result<S::Ok, S::Error>
where
    K: Serialize,
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(fields.len()))?;
    for (k, v) in fields {
        map.serialize_entry(k, v)?;
    }
    map.end()
}

pub fn deserialize_fields_from_map<'de, K, D>(deserializer: D) -> Result<Vec<(K, String)>, D::Error>
where
    K: Deserialize<'de>,
    D: Deserializer<'de>,
{
    struct MapVisitor<K>(PhantomData<K>);

    impl<'de, K: Deserialize<'de>> Visitor<'de> for MapVisitor<K> {
        type Value = Vec<(K, String)>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map of field values")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::MapAccess<'de>,
        {
            let mut fields = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<K, String>()? {
                fields.push((key, value));
            }
            Ok(fields)
        }
    }

    deserializer.deserialize_map(MapVisitor(PhantomData))
}
