// i18n.rs - 运行时界面文本
//
// 字符串表位置 (二选一)：
//   assets/i18n/<lang>.json            { "key": "value" }
//   assets/i18n.json                   { "<lang>": { "key": "value" } }
// 查找：当前语言 -> en -> key 本身；`{name}` 占位符由 tr_with 替换。

use crate::config::{find_asset, DEFAULT_LANG};
use once_cell::sync::OnceCell;
use std::{collections::HashMap, path::Path, sync::RwLock};

pub const LANGUAGES: [(&str, &str); 3] = [
    ("en", "English"),
    ("fr", "Français"),
    ("zh-Hans", "简体中文"),
];

type Table = HashMap<String, String>;

#[derive(Debug, Clone, Default)]
pub struct I18n {
    pub lang: String,
    table: Table,
    fallback: Table,
}

impl I18n {
    pub fn from_tables(lang: impl Into<String>, table: Table, fallback: Table) -> Self {
        Self {
            lang: lang.into(),
            table,
            fallback,
        }
    }

    pub fn load(lang: &str) -> Self {
        let table = load_table(lang);
        let fallback = if lang == DEFAULT_LANG {
            table.clone()
        } else {
            load_table(DEFAULT_LANG)
        };
        Self::from_tables(lang, table, fallback)
    }

    pub fn lookup(&self, key: &str) -> String {
        self.table
            .get(key)
            .or_else(|| self.fallback.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

static I18N: OnceCell<RwLock<I18n>> = OnceCell::new();

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("ignoring malformed string table {}: {e}", path.display());
            None
        }
    }
}

fn load_table(lang: &str) -> Table {
    let per_lang = find_asset(Path::new("i18n").join(format!("{lang}.json")));
    if let Some(t) = per_lang.and_then(|p| read_json(&p)) {
        return t;
    }

    let all: Option<HashMap<String, Table>> = find_asset("i18n.json").and_then(|p| read_json(&p));
    all.and_then(|mut m| m.remove(lang)).unwrap_or_default()
}

/// Switch the UI language. Later calls replace the current tables.
pub fn init(lang: impl Into<String>) {
    let lang: String = lang.into();
    let i = I18n::load(&lang);
    log::debug!("ui language set to {}", i.lang);

    match I18N.get() {
        Some(lock) => {
            if let Ok(mut w) = lock.write() {
                *w = i;
            }
        }
        None => {
            let _ = I18N.set(RwLock::new(i));
        }
    }
}

/// Localized text for `key`, or the key itself when nothing is loaded.
pub fn tr(key: &str) -> String {
    I18N.get()
        .and_then(|l| l.read().ok().map(|i| i.lookup(key)))
        .unwrap_or_else(|| key.to_string())
}

/// Like [`tr`], substituting `{name}` placeholders. Unknown placeholders stay as-is.
pub fn tr_with(key: &str, args: &[(&str, String)]) -> String {
    substitute(tr(key), args)
}

fn substitute(mut s: String, args: &[(&str, String)]) -> String {
    for (k, v) in args {
        s = s.replace(&format!("{{{k}}}"), v);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> Table {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn lookup_prefers_language_then_fallback_then_key() {
        let i = I18n::from_tables(
            "fr",
            table(&[("menu.file", "Fichier")]),
            table(&[("menu.file", "File"), ("menu.view", "View")]),
        );
        assert_eq!(i.lookup("menu.file"), "Fichier");
        assert_eq!(i.lookup("menu.view"), "View");
        assert_eq!(i.lookup("menu.nope"), "menu.nope");
    }

    #[test]
    fn placeholders_are_substituted() {
        let s = substitute(
            "{name} at {angle}° ({missing})".to_string(),
            &[("name", "Door".to_string()), ("angle", "12.5".to_string())],
        );
        assert_eq!(s, "Door at 12.5° ({missing})");
    }
}
