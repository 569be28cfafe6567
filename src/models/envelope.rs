use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Common `{ success, data, error, message }` wrapper returned by every
/// endpoint. Endpoint specific top-level fields (`minutes_remaining`,
/// `desc_updated`, ...) land in `extra`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(self.data.clone().unwrap_or(Value::Null))
    }

    pub fn extra_u32(&self, key: &str) -> Option<u32> {
        self.extra
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    }

    pub fn extra_bool(&self, key: &str) -> Option<bool> {
        self.extra.get(key).and_then(Value::as_bool)
    }
}
