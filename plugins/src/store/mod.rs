mod configurations;
mod findings;

pub use configurations::JsonConfigurationStore;
pub use findings::JsonFindingStore;

use std::path::Path;

use anyhow::Context;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Writes `bytes` next to `path` and renames over it, so readers see the old or the new file.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("write {}", Path::new(&tmp).display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("rename into {}", path.display()))?;
    Ok(())
}

// Everything but ASCII alphanumerics and `-_.` is escaped; `%` itself is, so the mapping is one-to-one.
const STEM_ESCAPED: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// File name for a configuration. Distinct names never share a file.
pub(crate) fn file_stem(name: &str) -> String {
    if name.is_empty() {
        // A lone `%` is never produced by escaping.
        return "%".to_string();
    }
    if name.bytes().all(|b| b == b'.') {
        return "%2E".repeat(name.len());
    }
    utf8_percent_encode(name, STEM_ESCAPED).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_escapes_separators() {
        assert_eq!(file_stem("my app/v2"), "my%20app%2Fv2");
        assert_eq!(file_stem(".."), "%2E%2E");
        assert_eq!(file_stem("ok-1.0"), "ok-1.0");
        assert_eq!(file_stem(""), "%");
    }

    #[test]
    fn file_stem_keeps_similar_names_apart() {
        let names = ["my app", "my_app", "my%20app", "a/b", "a_b", "a%2Fb", "..", "%2E%2E", "", "%"];
        let stems: std::collections::BTreeSet<String> = names.iter().copied().map(file_stem).collect();
        assert_eq!(stems.len(), names.len());
    }
}
