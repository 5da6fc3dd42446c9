//! Plugin registry and selection.
//!
//! The registry owns every loaded plugin record, in load order. Sessions
//! share it behind `Arc<RwLock<_>>`; the selection pass is the only
//! writer, and the launch state is the only field it touches.

use std::cmp::Ordering;

use tracing::debug;

/// Selection list that enables every plugin.
pub const ENABLE_ALL_LIST: &str = "-1;";

/// Check classes, in wire order.
///
/// The last slot doubles as the mapping for any raw category index the
/// table does not know, so stale cache data can never crash a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Init,
    Scanner,
    Settings,
    GatherInfo,
    Attack,
    MixedAttack,
    DestructiveAttack,
    Denial,
    KillHost,
    Flood,
    End,
    Unknown,
}

impl Category {
    const TABLE: [Category; 12] = [
        Category::Init,
        Category::Scanner,
        Category::Settings,
        Category::GatherInfo,
        Category::Attack,
        Category::MixedAttack,
        Category::DestructiveAttack,
        Category::Denial,
        Category::KillHost,
        Category::Flood,
        Category::End,
        Category::Unknown,
    ];

    /// Maps a raw category index; anything out of range becomes `Unknown`.
    pub fn from_index(index: i32) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::TABLE.get(i).copied())
            .unwrap_or(Category::Unknown)
    }

    /// Wire name of the category.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Init => "init",
            Category::Scanner => "scanner",
            Category::Settings => "settings",
            Category::GatherInfo => "infos",
            Category::Attack => "attack",
            Category::MixedAttack => "mixed",
            Category::DestructiveAttack => "destructive_attack",
            Category::Denial => "denial",
            Category::KillHost => "kill_host",
            Category::Flood => "flood",
            Category::End => "end",
            Category::Unknown => "unknown",
        }
    }
}

/// Whether a plugin will run in the upcoming scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LaunchState {
    #[default]
    Default,
    Disabled,
    Run,
}

/// One loaded plugin (NVT).
///
/// All metadata is immutable for the lifetime of a session; only the
/// launch state changes, through [`Registry::apply_selection`]. Optional
/// fields may be absent in the backing cache; the formatter decides
/// whether such a record is transmittable.
#[derive(Debug, Clone)]
pub struct PluginRecord {
    /// Dotted-numeric identifier, unique within the registry.
    pub oid: String,
    pub name: Option<String>,
    pub category: Category,
    pub copyright: Option<String>,
    pub summary: Option<String>,
    pub family: Option<String>,
    pub version: Option<String>,
    pub cve: Option<String>,
    pub bid: Option<String>,
    pub xref: Option<String>,
    pub tag: Option<String>,
    launch: LaunchState,
}

impl PluginRecord {
    pub fn new(oid: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            name: None,
            category: Category::Unknown,
            copyright: None,
            summary: None,
            family: None,
            version: None,
            cve: None,
            bid: None,
            xref: None,
            tag: None,
            launch: LaunchState::Default,
        }
    }

    pub fn launch(&self) -> LaunchState {
        self.launch
    }
}

/// Ordered collection of plugin records (load order, not OID order).
#[derive(Debug, Default)]
pub struct Registry {
    records: Vec<PluginRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: PluginRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginRecord> {
        self.records.iter()
    }

    /// Linear scan for an exact OID match.
    pub fn find(&self, oid: &str) -> Option<&PluginRecord> {
        self.records.iter().find(|r| r.oid == oid)
    }

    /// Applies a controller-supplied selection list.
    ///
    /// `list` is a semicolon-delimited set of OID tokens. `-1;`, or no
    /// list at all, enables every record. Any other list first disables
    /// every record, then re-enables the listed OIDs through a binary
    /// search over a transient OID-sorted index; tokens naming no record
    /// are skipped. An empty or all-whitespace list therefore leaves
    /// everything disabled.
    ///
    /// The registry's own order is never changed; the sorted index is
    /// discarded after the pass.
    pub fn apply_selection(&mut self, list: Option<&str>) {
        if self.records.is_empty() {
            return;
        }
        let list = list.unwrap_or(ENABLE_ALL_LIST);
        let state = if enables_all(list) {
            LaunchState::Run
        } else {
            LaunchState::Disabled
        };
        for record in &mut self.records {
            record.launch = state;
        }
        if state == LaunchState::Run {
            return;
        }

        let mut index: Vec<usize> = (0..self.records.len()).collect();
        index.sort_unstable_by(|&a, &b| self.records[a].oid.cmp(&self.records[b].oid));

        for token in list.split(';').filter(|t| !t.is_empty()) {
            match search(&index, &self.records, token) {
                Some(pos) => self.records[pos].launch = LaunchState::Run,
                None => debug!(oid = token, "selection names an unknown plugin"),
            }
        }
    }
}

/// A list whose leading integer is -1 selects everything.
fn enables_all(list: &str) -> bool {
    let token = list.split(';').next().unwrap_or("");
    token.trim().parse::<i64>() == Ok(-1)
}

/// Iterative binary search over an OID-sorted index of record positions.
///
/// Returns the position (in registry order) of the record whose OID
/// exactly equals `oid`.
fn search(index: &[usize], records: &[PluginRecord], oid: &str) -> Option<usize> {
    let mut lo = 0;
    let mut hi = index.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let pos = index[mid];
        match records[pos].oid.as_str().cmp(oid) {
            Ordering::Equal => return Some(pos),
            Ordering::Greater => hi = mid,
            Ordering::Less => lo = mid + 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_of(oids: &[&str]) -> Registry {
        let mut registry = Registry::new();
        for oid in oids {
            registry.push(PluginRecord::new(*oid));
        }
        registry
    }

    fn states(registry: &Registry) -> Vec<LaunchState> {
        registry.iter().map(|r| r.launch()).collect()
    }

    #[test]
    fn no_list_enables_everything() {
        let mut registry = registry_of(&["1.1", "1.2", "1.3"]);
        registry.apply_selection(None);
        assert_eq!(states(&registry), vec![LaunchState::Run; 3]);
    }

    #[test]
    fn sentinel_enables_everything_regardless_of_prior_state() {
        let mut registry = registry_of(&["1.1", "1.2"]);
        registry.apply_selection(Some("1.2;"));
        registry.apply_selection(Some("-1;"));
        assert_eq!(states(&registry), vec![LaunchState::Run; 2]);
    }

    #[test]
    fn listed_oids_run_and_the_rest_are_disabled() {
        let mut registry = registry_of(&["1.1", "1.2", "1.3"]);
        registry.apply_selection(Some("1.3;1.1;"));
        assert_eq!(registry.find("1.1").unwrap().launch(), LaunchState::Run);
        assert_eq!(
            registry.find("1.2").unwrap().launch(),
            LaunchState::Disabled
        );
        assert_eq!(registry.find("1.3").unwrap().launch(), LaunchState::Run);
    }

    #[test]
    fn unknown_tokens_are_skipped() {
        let mut registry = registry_of(&["1.1", "1.2"]);
        registry.apply_selection(Some("1.1;9.9.9;"));
        assert_eq!(registry.find("1.1").unwrap().launch(), LaunchState::Run);
        assert_eq!(
            registry.find("1.2").unwrap().launch(),
            LaunchState::Disabled
        );
    }

    #[test]
    fn empty_list_disables_everything() {
        let mut registry = registry_of(&["1.1", "1.2"]);
        registry.apply_selection(Some(""));
        assert_eq!(states(&registry), vec![LaunchState::Disabled; 2]);
    }

    #[test]
    fn whitespace_list_disables_everything() {
        let mut registry = registry_of(&["1.1", "1.2"]);
        registry.apply_selection(Some("   ;"));
        assert_eq!(states(&registry), vec![LaunchState::Disabled; 2]);
    }

    #[test]
    fn empty_registry_is_a_noop() {
        let mut registry = Registry::new();
        registry.apply_selection(Some("1.1;"));
        assert!(registry.is_empty());
    }

    #[test]
    fn selection_preserves_load_order() {
        let mut registry = registry_of(&["9.9", "1.1", "5.5"]);
        registry.apply_selection(Some("5.5;"));
        let oids: Vec<&str> = registry.iter().map(|r| r.oid.as_str()).collect();
        assert_eq!(oids, ["9.9", "1.1", "5.5"]);
    }

    #[test]
    fn search_matches_linear_scan_for_every_input() {
        let oids = [
            "1.3.6.1.4.1.25623.1.0.10", "1.1", "1.10", "1.2", "2.0", "10.1", "1.3",
        ];
        let registry = registry_of(&oids);
        let records: Vec<PluginRecord> = registry.iter().cloned().collect();
        let mut index: Vec<usize> = (0..records.len()).collect();
        index.sort_unstable_by(|&a, &b| records[a].oid.cmp(&records[b].oid));

        let mut queries: Vec<&str> = oids.to_vec();
        queries.extend(["1.0", "1.11", "9.9.9", "", "2"]);
        for query in queries {
            let linear = records.iter().position(|r| r.oid == query);
            assert_eq!(search(&index, &records, query), linear, "query {query:?}");
        }
    }

    #[test]
    fn category_maps_out_of_range_to_unknown() {
        assert_eq!(Category::from_index(3), Category::GatherInfo);
        assert_eq!(Category::from_index(-1), Category::Unknown);
        assert_eq!(Category::from_index(99), Category::Unknown);
        assert_eq!(Category::from_index(11), Category::Unknown);
    }

    #[test]
    fn enables_all_accepts_leading_integer_forms() {
        assert!(enables_all("-1;"));
        assert!(enables_all("-1"));
        assert!(enables_all(" -1 ;1.2;"));
        assert!(!enables_all("1.1;"));
        assert!(!enables_all(""));
        assert!(!enables_all("-12;"));
    }
}
