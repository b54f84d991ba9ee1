//! Site selection - expand a CLI/API selector into site ids
//!
//! Takes a comma-separated selector and expands it into a deduplicated,
//! ordered list of site ids. Supported token forms:
//! - `all`: every registered site, in registration order
//! - a site id: `"google"` (case-insensitive, surrounding spaces ignored)
//!
//! Unknown ids are kept so the orchestrator can report them per key.

use anyhow::Result;

pub struct SiteSelection;

impl SiteSelection {
    /// Resolve `selector` against the `known` ids.
    pub fn resolve(selector: &str, known: &[&str]) -> Result<Vec<String>> {
        if selector.trim().is_empty() {
            anyhow::bail!("No sites specified");
        }

        let mut ids: Vec<String> = Vec::new();

        for token in selector.split(',') {
            let t = token.trim().to_ascii_lowercase();
            if t.is_empty() {
                continue;
            }

            if t == "all" {
                for id in known {
                    let id = id.to_string();
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                continue;
            }

            if !ids.contains(&t) {
                ids.push(t);
            }
        }

        if ids.is_empty() {
            anyhow::bail!("No sites specified");
        }

        Ok(ids)
    }

    /// Ids in `selected` that are not in `known`.
    pub fn unknown<'a>(selected: &'a [String], known: &[&str]) -> Vec<&'a str> {
        selected
            .iter()
            .map(String::as_str)
            .filter(|id| !known.contains(id))
            .collect()
    }
}
