// Remote menu endpoint catalogue
//
// The eight `rm*` endpoints that together describe the controller's
// parameter menu. All are served from `/service/{name}`; every one
// except the raw values takes a `lang` query parameter.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator};

/// One of the raw remote-menu endpoints.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    AsRefStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum Endpoint {
    /// Current values + editable flag + bounds + unit index.
    #[strum(serialize = "rmParamsData")]
    #[serde(rename = "rmParamsData")]
    ParamsData,
    #[strum(serialize = "rmParamsNames")]
    #[serde(rename = "rmParamsNames")]
    ParamsNames,
    #[strum(serialize = "rmParamsDescs")]
    #[serde(rename = "rmParamsDescs")]
    ParamsDescs,
    #[strum(serialize = "rmParamsEnums")]
    #[serde(rename = "rmParamsEnums")]
    ParamsEnums,
    #[strum(serialize = "rmParamsUnitsNames")]
    #[serde(rename = "rmParamsUnitsNames")]
    UnitsNames,
    #[strum(serialize = "rmCatsNames")]
    #[serde(rename = "rmCatsNames")]
    CatsNames,
    #[strum(serialize = "rmLocksNames")]
    #[serde(rename = "rmLocksNames")]
    LocksNames,
    /// Menu tree: the only source of parameter numbers, categories and locks.
    #[strum(serialize = "rmStructure")]
    #[serde(rename = "rmStructure")]
    Structure,
}

impl Endpoint {
    /// Service path segment, e.g. `rmParamsNames`.
    pub fn name(self) -> &'static str {
        match self {
            Self::ParamsData => "rmParamsData",
            Self::ParamsNames => "rmParamsNames",
            Self::ParamsDescs => "rmParamsDescs",
            Self::ParamsEnums => "rmParamsEnums",
            Self::UnitsNames => "rmParamsUnitsNames",
            Self::CatsNames => "rmCatsNames",
            Self::LocksNames => "rmLocksNames",
            Self::Structure => "rmStructure",
        }
    }

    /// Whether the endpoint returns language-dependent text and takes `lang`.
    pub fn is_localized(self) -> bool {
        !matches!(self, Self::ParamsData)
    }

    /// Every endpoint, in fetch order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

/// Query parameters shared by all remote-menu requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceQuery {
    pub uid: String,
    pub lang: String,
}

impl ServiceQuery {
    pub fn new(uid: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            lang: lang.into(),
        }
    }
}
