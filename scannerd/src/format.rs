//! Plugin metadata formatting for the wire.
//!
//! One record becomes one protocol line. A record that cannot be rendered
//! safely is never transmitted at all: partial or corrupt lines must not
//! reach the peer, so validation failures skip the record with a warning
//! and the session carries on.

use otp::LineBuilder;
use tracing::warn;

use crate::registry::PluginRecord;

/// Summary placeholder used when the tag blob already carries one.
const NO_SUMMARY: &str = "NOSUMMARY";

/// Renders one plugin record as a single protocol line.
///
/// Field order is fixed: OID, name, category, copyright, summary, family,
/// version, CVE, BID, cross-references, tag. Absent reference fields get
/// their `NO*` placeholders and an absent version becomes `?`. The tag is
/// the only sanitized field: embedded newlines become semicolons.
/// Records missing name, copyright, summary, or family, or carrying an
/// embedded newline in an unsanitized field, yield `None`.
pub fn plugin_line(record: &PluginRecord) -> Option<String> {
    let oid = record.oid.as_str();

    let Some(name) = record.name.as_deref() else {
        warn!(oid, "inconsistent data (no name), not transmitted");
        return None;
    };
    let Some(copyright) = record.copyright.as_deref() else {
        warn!(oid, "inconsistent data (no copyright), not transmitted");
        return None;
    };
    // A tag blob that already embeds a summary wins over the summary
    // field, so downstream consumers see the text only once.
    let summary = if record.tag.as_deref().is_some_and(|t| t.contains("summary=")) {
        NO_SUMMARY
    } else {
        match record.summary.as_deref() {
            Some(summary) => summary,
            None => {
                warn!(oid, "inconsistent data (no summary), not transmitted");
                return None;
            }
        }
    };
    let Some(family) = record.family.as_deref() else {
        warn!(oid, "inconsistent data (no family), not transmitted");
        return None;
    };

    for (field, value) in [
        ("name", name),
        ("copyright", copyright),
        ("summary", summary),
    ] {
        if value.contains('\n') {
            warn!(oid, field, "embedded newline, not transmitted");
            return None;
        }
    }

    let version = record.version.as_deref().unwrap_or("?");
    let cve = non_empty(record.cve.as_deref()).unwrap_or("NOCVE");
    let bid = non_empty(record.bid.as_deref()).unwrap_or("NOBID");
    let xref = non_empty(record.xref.as_deref()).unwrap_or("NOXREF");
    let tag = match non_empty(record.tag.as_deref()) {
        Some(tag) => tag.replace('\n', ";"),
        None => "NOTAG".to_string(),
    };

    Some(
        LineBuilder::new(oid)
            .field(name)
            .field(record.category.as_str())
            .field(copyright)
            .field(summary)
            .field(family)
            .field(version)
            .field(cve)
            .field(bid)
            .field(xref)
            .field(&tag)
            .finish(),
    )
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
