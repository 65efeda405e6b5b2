// --- Data source tags ---

/// The fixed set of external data sources, in canonical fan-in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Google,
    Website,
    Facebook,
    Instagram,
}

impl Source {
    /// Canonical ordering used when assembling scrape results,
    /// independent of connector completion order.
    pub const ALL: [Source; 4] = [
        Source::Google,
        Source::Website,
        Source::Facebook,
        Source::Instagram,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Google => "google",
            Source::Website => "website",
            Source::Facebook => "facebook",
            Source::Instagram => "instagram",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
