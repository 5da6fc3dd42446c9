//! Scanner preference store.
//!
//! Preferences are key/value pairs shared by every session. Only
//! text-valued entries that are not scanner-internal ever cross the wire;
//! compound values are structure for other scanner subsystems and stay
//! local.

/// Preference value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefValue {
    Text(String),
    Compound(Vec<String>),
}

/// One scanner preference.
#[derive(Debug, Clone)]
pub struct PrefEntry {
    pub key: String,
    pub value: PrefValue,
    /// Scanner-internal entries are never exported to a controller.
    pub scanner_only: bool,
}

/// Preference keys that stay scanner-internal regardless of how the store
/// was seeded.
const SCANNER_ONLY_KEYS: &[&str] = &[
    "config_file",
    "plugins_folder",
    "dumpfile",
    "logfile",
    "log_whole_attack",
    "log_plugins_name_at_load",
    "be_nice",
    "negot_timeout",
];

/// In-memory preference store, seeded at startup.
#[derive(Debug, Default)]
pub struct Preferences {
    entries: Vec<PrefEntry>,
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `key`, deriving its visibility
    /// from the scanner-internal key list.
    pub fn set(&mut self, key: impl Into<String>, value: PrefValue) {
        let key = key.into();
        let scanner_only = SCANNER_ONLY_KEYS.contains(&key.as_str());
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.value = value,
            None => self.entries.push(PrefEntry {
                key,
                value,
                scanner_only,
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&PrefValue> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PrefEntry> {
        self.entries.iter()
    }

    /// Entries eligible for export: text-valued and not scanner-internal.
    pub fn exportable(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|e| match &e.value {
            PrefValue::Text(value) if !e.scanner_only => {
                Some((e.key.as_str(), value.as_str()))
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_existing_values() {
        let mut prefs = Preferences::new();
        prefs.set("checks_read_timeout", PrefValue::Text("5".to_string()));
        prefs.set("checks_read_timeout", PrefValue::Text("10".to_string()));
        assert_eq!(prefs.len(), 1);
        assert_eq!(
            prefs.get("checks_read_timeout"),
            Some(&PrefValue::Text("10".to_string()))
        );
    }

    #[test]
    fn exportable_skips_scanner_only_keys() {
        let mut prefs = Preferences::new();
        prefs.set("logfile", PrefValue::Text("/var/log/scannerd.log".to_string()));
        prefs.set("optimize_test", PrefValue::Text("yes".to_string()));
        let exported: Vec<(&str, &str)> = prefs.exportable().collect();
        assert_eq!(exported, [("optimize_test", "yes")]);
    }

    #[test]
    fn exportable_skips_compound_values() {
        let mut prefs = Preferences::new();
        prefs.set(
            "port_range_list",
            PrefValue::Compound(vec!["1-1024".to_string(), "8080".to_string()]),
        );
        prefs.set("safe_checks", PrefValue::Text("yes".to_string()));
        let exported: Vec<(&str, &str)> = prefs.exportable().collect();
        assert_eq!(exported, [("safe_checks", "yes")]);
    }
}
