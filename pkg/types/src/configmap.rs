use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::object::ObjectMeta;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMap {
    #[serde(flatten)]
    pub meta: ObjectMeta,
    #[serde(default)]
    pub data: HashMap<String, String>,
}
