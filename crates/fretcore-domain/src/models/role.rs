use serde::{Deserialize, Serialize};

use crate::capability::Capabilities;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub capabilities: Capabilities,
}
