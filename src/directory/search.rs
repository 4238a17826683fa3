//! Resolves login identifiers to directory entries.

use crate::directory::settings::PLACEHOLDER;
use crate::directory::{DirectoryEntry, DirectorySession, DirectorySettings};
use crate::error::Result;

/// Substitute `identifier` into the configured template.
///
/// The identifier is escaped per RFC 4515 so it cannot widen the
/// filter. Templates follow the `attribute={0}` convention; the wire
/// form needs surrounding parentheses, added here when the template
/// does not carry its own.
pub(crate) fn build_filter(template: &str, identifier: &str) -> String {
    let filter = template.replace(PLACEHOLDER, &escape_filter(identifier));
    if filter.starts_with('(') {
        filter
    } else {
        format!("({filter})")
    }
}

fn escape_filter(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '*' => out.push_str(r"\2a"),
            '(' => out.push_str(r"\28"),
            ')' => out.push_str(r"\29"),
            '\\' => out.push_str(r"\5c"),
            '\0' => out.push_str(r"\00"),
            c => out.push(c),
        }
    }
    out
}

/// Entries matching `identifier` under the configured organizational
/// unit. Ordering is whatever the server returned.
pub(crate) async fn find_entries(
    session: &mut dyn DirectorySession,
    settings: &DirectorySettings,
    identifier: &str,
) -> Result<Vec<DirectoryEntry>> {
    let filter = build_filter(&settings.search_template, identifier);
    session
        .search(
            &settings.organizational_unit,
            &filter,
            &settings.mapped_attributes(),
        )
        .await
}
