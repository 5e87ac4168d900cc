//! Pending settings for modules that have not registered yet

use crate::contract::{RegistryError, RegistryResult};
use std::collections::BTreeMap;

/// Raw `module.setting = value` triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSetting {
    pub module: String,
    pub setting: String,
    pub value: String,
}

/// Split `module.setting` on the first '.'; setting names may contain more dots
pub fn split_lvalue(lvalue: &str) -> RegistryResult<(&str, &str)> {
    match lvalue.split_once('.') {
        Some((module, setting)) if !module.is_empty() && !setting.is_empty() => {
            Ok((module, setting))
        }
        _ => Err(RegistryError::MalformedArgument {
            lvalue: lvalue.to_string(),
        }),
    }
}

/// Parse an argument list of `module.setting value` pairs
///
/// The whole list is checked before anything is returned, so a bad list
/// stages nothing.
pub fn parse_arguments(tokens: &[String]) -> RegistryResult<Vec<RawSetting>> {
    if tokens.len() % 2 != 0 {
        return Err(RegistryError::OddArgumentCount {
            count: tokens.len(),
        });
    }

    tokens
        .chunks_exact(2)
        .map(|pair| {
            let (module, setting) = split_lvalue(&pair[0])?;
            Ok(RawSetting {
                module: module.to_string(),
                setting: setting.to_string(),
                value: pair[1].clone(),
            })
        })
        .collect()
}

/// Raw settings keyed by module name, then setting name
#[derive(Debug, Default, Clone)]
pub struct Unclaimed {
    modules: BTreeMap<String, BTreeMap<String, String>>,
}

impl Unclaimed {
    /// Stage a value, returning the value it replaced
    pub fn stage(&mut self, raw: RawSetting) -> Option<String> {
        self.modules
            .entry(raw.module)
            .or_default()
            .insert(raw.setting, raw.value)
    }

    /// Remove and return every staged setting of a module
    pub fn take(&mut self, module: &str) -> Option<BTreeMap<String, String>> {
        self.modules.remove(module)
    }

    pub fn get(&self, module: &str) -> Option<&BTreeMap<String, String>> {
        self.modules.get(module)
    }

    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    pub fn modules(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    /// Empty the staging area
    pub fn drain(&mut self) -> BTreeMap<String, BTreeMap<String, String>> {
        std::mem::take(&mut self.modules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_on_first_dot_only() {
        assert_eq!(split_lvalue("moduleA.settingX").unwrap(), ("moduleA", "settingX"));
        assert_eq!(split_lvalue("TOTP.Window.Size").unwrap(), ("TOTP", "Window.Size"));
    }

    #[test]
    fn test_split_rejects_malformed() {
        for lvalue in ["nodot", ".setting", "module.", ""] {
            assert!(
                matches!(split_lvalue(lvalue), Err(RegistryError::MalformedArgument { .. })),
                "{lvalue}"
            );
        }
    }

    #[test]
    fn test_parse_arguments_pairs() {
        let parsed =
            parse_arguments(&tokens(&["moduleA.settingX", "5", "moduleA.settingY", "7"])).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].module, "moduleA");
        assert_eq!(parsed[0].setting, "settingX");
        assert_eq!(parsed[0].value, "5");
        assert_eq!(parsed[1].setting, "settingY");
    }

    #[test]
    fn test_parse_arguments_odd() {
        let result = parse_arguments(&tokens(&["module.setting"]));
        assert!(matches!(result, Err(RegistryError::OddArgumentCount { count: 1 })));
    }

    #[test]
    fn test_parse_arguments_empty() {
        assert!(parse_arguments(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_stage_overwrites() {
        let mut unclaimed = Unclaimed::default();
        let raw = |value: &str| RawSetting {
            module: "m".to_string(),
            setting: "s".to_string(),
            value: value.to_string(),
        };

        assert_eq!(unclaimed.stage(raw("1")), None);
        assert_eq!(unclaimed.stage(raw("2")), Some("1".to_string()));
        assert_eq!(unclaimed.get("m").unwrap().len(), 1);
        assert_eq!(unclaimed.get("m").unwrap().get("s").unwrap(), "2");

        let taken = unclaimed.take("m").unwrap();
        assert_eq!(taken.len(), 1);
        assert!(unclaimed.modules().is_empty());
        assert!(!unclaimed.contains("m"));
        assert!(unclaimed.take("m").is_none());
    }
}
