use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::object::ObjectMeta;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    #[serde(flatten)]
    pub meta: ObjectMeta,
    /// Secret data stored as base64-encoded values.
    #[serde(default)]
    pub data: HashMap<String, String>,
}
