//! `devices:` field — either the literal string `"all"` or an explicit list
//! of device names (spec.md §3, "DeviceSelector"; §9, "Dynamic YAML ->
//! static model").

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DeviceSelector {
    All,
    List(Vec<String>),
}

impl DeviceSelector {
    /// Resolve against the full device inventory, expanding `All` to every
    /// non-host device sorted lexically (spec.md §3).
    #[must_use]
    pub fn resolve(&self, all_devices: &[String]) -> Vec<String> {
        match self {
            Self::All => {
                let mut resolved = all_devices.to_vec();
                resolved.sort();
                resolved
            }
            Self::List(names) => names.clone(),
        }
    }
}

impl<'de> Deserialize<'de> for DeviceSelector {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Keyword(String),
            List(Vec<String>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Keyword(s) if s == "all" => Ok(DeviceSelector::All),
            Raw::Keyword(other) => Err(serde::de::Error::custom(format!(
                "devices: expected \"all\" or a list of device names, got \"{other}\""
            ))),
            Raw::List(names) => Ok(DeviceSelector::List(names)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_expands_sorted() {
        let selector = DeviceSelector::All;
        let devices = vec!["leaf2".to_owned(), "leaf1".to_owned(), "spine1".to_owned()];
        assert_eq!(
            selector.resolve(&devices),
            vec!["leaf1".to_owned(), "leaf2".to_owned(), "spine1".to_owned()]
        );
    }

    #[test]
    fn explicit_list_preserves_declared_order() {
        let selector = DeviceSelector::List(vec!["leaf2".to_owned(), "leaf1".to_owned()]);
        assert_eq!(
            selector.resolve(&[]),
            vec!["leaf2".to_owned(), "leaf1".to_owned()]
        );
    }

    #[test]
    fn yaml_string_all_parses() {
        let selector: DeviceSelector = serde_yaml::from_str("all").unwrap();
        assert_eq!(selector, DeviceSelector::All);
    }

    #[test]
    fn yaml_list_parses() {
        let selector: DeviceSelector = serde_yaml::from_str("[leaf1, leaf2]").unwrap();
        assert_eq!(
            selector,
            DeviceSelector::List(vec!["leaf1".to_owned(), "leaf2".to_owned()])
        );
    }

    #[test]
    fn yaml_other_keyword_rejected() {
        let result: Result<DeviceSelector, _> = serde_yaml::from_str("none");
        assert!(result.is_err());
    }
}
