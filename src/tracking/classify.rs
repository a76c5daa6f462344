use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Above,
    Below,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
        }
    }
}

pub fn classify(subscribers: i64, threshold: i64) -> Classification {
    if subscribers >= threshold {
        Classification::Above
    } else {
        Classification::Below
    }
}
