//! Translations
//!
//! English and Bangla tables are compiled in from `locales/*.json` and
//! flattened to `namespace:a.b.c` keys. Keys without a namespace resolve
//! against `common`. Lookups fall back to the other language, then to the
//! key itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

const EN_SOURCE: &str = include_str!("../locales/en.json");
const BN_SOURCE: &str = include_str!("../locales/bn.json");
const DEFAULT_NAMESPACE: &str = "common";

/// Supported UI languages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Bn,
}

impl Lang {
    pub fn code(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Bn => "bn",
        }
    }

    /// Language name spliced into explain prompts
    pub fn prompt_name(&self) -> &'static str {
        match self {
            Lang::En => "english",
            Lang::Bn => "bangla",
        }
    }

    pub fn other(&self) -> Lang {
        match self {
            Lang::En => Lang::Bn,
            Lang::Bn => Lang::En,
        }
    }

    /// Map a POSIX locale string (`bn_BD.UTF-8`, `en_US`) to a language
    pub fn from_locale(locale: &str) -> Option<Lang> {
        let code = locale
            .split(|c| c == '_' || c == '-' || c == '.')
            .next()?
            .to_lowercase();
        match code.as_str() {
            "bn" => Some(Lang::Bn),
            "en" => Some(Lang::En),
            _ => None,
        }
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Lang::En),
            "bn" | "bangla" | "bengali" => Ok(Lang::Bn),
            _ => Err(format!("Unknown language: {}. Use en or bn", s)),
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

type Table = HashMap<String, String>;

lazy_static::lazy_static! {
    static ref TABLES: HashMap<Lang, Table> = {
        let mut tables = HashMap::new();
        tables.insert(Lang::En, load_table(EN_SOURCE));
        tables.insert(Lang::Bn, load_table(BN_SOURCE));
        tables
    };
}

/// Flatten a locale file; a broken file yields an empty table
fn load_table(source: &str) -> Table {
    let mut table = Table::new();
    if let Ok(Value::Object(namespaces)) = serde_json::from_str::<Value>(source) {
        for (ns, tree) in namespaces {
            flatten_into(&mut table, &format!("{}:", ns), &tree);
        }
    }
    table
}

fn flatten_into(table: &mut Table, prefix: &str, node: &Value) {
    match node {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.ends_with(':') {
                    format!("{}{}", prefix, key)
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(table, &path, child);
            }
        }
        Value::String(text) => {
            table.insert(prefix.to_string(), text.clone());
        }
        _ => {}
    }
}

fn qualify(key: &str) -> String {
    if key.contains(':') {
        key.to_string()
    } else {
        format!("{}:{}", DEFAULT_NAMESPACE, key)
    }
}

/// Replace `{{name}}` placeholders
pub fn interpolate(template: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{{{}}}}}", name), value)
    })
}

/// Language-bound lookup handle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Translator {
    lang: Lang,
}

impl Translator {
    pub fn new(lang: Lang) -> Self {
        Self { lang }
    }

    pub fn lang(&self) -> Lang {
        self.lang
    }

    pub fn set_lang(&mut self, lang: Lang) {
        self.lang = lang;
    }

    /// Lookup with fallback to the other language; None when neither has the key
    pub fn try_t(&self, key: &str) -> Option<&'static str> {
        let key = qualify(key);
        [self.lang, self.lang.other()]
            .iter()
            .filter_map(|lang| TABLES.get(lang))
            .find_map(|table| table.get(&key))
            .map(String::as_str)
            .filter(|text| !text.is_empty())
    }

    /// Lookup; a missing key is returned as-is
    pub fn t(&self, key: &str) -> String {
        self.try_t(key).map(str::to_string).unwrap_or_else(|| key.to_string())
    }

    pub fn t_with(&self, key: &str, args: &[(&str, &str)]) -> String {
        interpolate(&self.t(key), args)
    }

    /// Localized crop name, or the wire name
    pub fn crop_name(&self, wire_name: &str) -> String {
        self.try_t(&format!("soilInput:crops.{}", wire_name))
            .map(str::to_string)
            .unwrap_or_else(|| wire_name.to_string())
    }

    pub fn soil_color_name(&self, wire_name: &str) -> String {
        self.try_t(&format!("soilInput:soilColors.{}", wire_name))
            .map(str::to_string)
            .unwrap_or_else(|| wire_name.to_string())
    }

    /// Localized disease name, or the raw label
    pub fn disease_name(&self, label: &str) -> String {
        self.try_t(&format!("soilInput:diseases.{}", label))
            .map(str::to_string)
            .unwrap_or_else(|| label.to_string())
    }

    pub fn lang_name(&self, lang: Lang) -> String {
        self.t(&format!("common:language.{}", lang.code()))
    }
}
