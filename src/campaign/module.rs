//! Path-to-module resolution for splitting oversized campaigns.

use regex::Regex;

use crate::config::ModuleConvention;

/// Module name for paths no convention recognizes.
pub const ROOT_MODULE: &str = "root";

/// Names the module a file belongs to.
pub trait ModuleResolver {
    fn resolve_module(&self, path: &str) -> String;
}

/// Resolves modules from an ordered list of path regexes. The first
/// convention that matches wins; its first capture group is the module.
pub struct ConventionResolver {
    conventions: Vec<(Regex, Option<String>)>,
}

impl ConventionResolver {
    pub fn new(conventions: &[ModuleConvention]) -> Result<Self, String> {
        let conventions = conventions
            .iter()
            .map(|c| {
                Regex::new(&c.pattern)
                    .map(|re| (re, c.strip_suffix.clone()))
                    .map_err(|e| format!("invalid module convention '{}': {e}", c.pattern))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { conventions })
    }
}

impl ModuleResolver for ConventionResolver {
    fn resolve_module(&self, path: &str) -> String {
        self.conventions
            .iter()
            .find_map(|(re, strip_suffix)| {
                let name = re.captures(path)?.get(1)?.as_str();
                let name = strip_suffix
                    .as_deref()
                    .and_then(|suffix| name.strip_suffix(suffix))
                    .unwrap_or(name);
                (!name.is_empty()).then(|| name.to_string())
            })
            .unwrap_or_else(|| ROOT_MODULE.to_string())
    }
}
