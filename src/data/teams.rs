//! Team-name canonicalization
//!
//! swehockey spells some clubs differently between seasons (and sometimes
//! leaks match-start notes into the name cell). Known aliases map to one
//! canonical name; anything unknown passes through unchanged.

use std::collections::HashMap;

/// Static alias → canonical name lookup
#[derive(Debug, Clone)]
pub struct TeamDirectory {
    aliases: HashMap<String, String>,
}

impl Default for TeamDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl TeamDirectory {
    pub fn new() -> Self {
        TeamDirectory {
            aliases: Self::default_aliases(),
        }
    }

    /// Add or override an alias
    pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.aliases
            .insert(alias.trim().to_lowercase(), canonical.to_string());
        self
    }

    fn default_aliases() -> HashMap<String, String> {
        let mut aliases = HashMap::new();

        for (canonical, names) in [
            ("AIK", &["A I K IF", "AIK IF"][..]),
            ("Bofors IK", &["Bofors IK Karlskoga"][..]),
            (
                "Färjestad BK",
                &["Färjestad BKMatchstart ca 20.30", "Färjestads BK"][..],
            ),
            ("Linköping HC", &["Linköpings HC"][..]),
            ("Västerås IK", &["VIK Västerås HK"][..]),
        ] {
            for name in names {
                aliases.insert(name.to_lowercase(), canonical.to_string());
            }
        }

        aliases
    }

    /// Canonical name for a team as written on the page
    pub fn canonical(&self, name: &str) -> String {
        let trimmed = name.trim();
        match self.aliases.get(&trimmed.to_lowercase()) {
            Some(canonical) => canonical.clone(),
            None => trimmed.to_string(),
        }
    }
}
