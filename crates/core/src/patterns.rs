//! Include/exclude pattern lists
//!
//! Patterns are shell-style wildcards matched against the path of a changed
//! file relative to its watcher root. `*` and `?` also match `/`, so `*.log`
//! matches `a/b/c.log` as well as `c.log`.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// A compiled list of glob patterns
#[derive(Debug, Clone)]
pub struct PatternList {
    /// Source patterns, in configuration order
    patterns: Vec<String>,

    /// Compiled matcher for all patterns
    set: GlobSet,
}

impl PatternList {
    /// Compile a pattern list
    ///
    /// Returns the offending pattern alongside the error when one of them
    /// does not compile.
    pub fn new<I, S>(patterns: I) -> Result<Self, (String, globset::Error)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let mut builder = GlobSetBuilder::new();

        for pattern in &patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(false)
                .build()
                .map_err(|e| (pattern.clone(), e))?;
            builder.add(glob);
        }

        let set = builder.build().map_err(|e| (String::new(), e))?;
        Ok(Self { patterns, set })
    }

    /// Check if a relative path matches any pattern
    pub fn matches(&self, rfile: &str) -> bool {
        !self.patterns.is_empty() && self.set.is_match(rfile)
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Source patterns
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for PatternList {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }
}
