/// Options shared by every encode and decode call of a [`Runtime`].
///
/// [`Runtime`]: crate::Runtime
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Whether embedded relationship targets are written to `included`.
    /// When off, relationships carry identifiers only.
    pub sideload: bool,
    /// Whether embedded relationship targets are written in full inside
    /// relationship data instead of `included`. Takes precedence over
    /// `sideload`.
    pub nest_embedded: bool,
    /// Maximum nesting of relationship targets materialized while
    /// decoding. Deeper targets are decoded as stubs.
    pub max_include_depth: usize,
    /// Upper bound on relationship targets materialized by one decode
    /// call. A document that needs more fails with
    /// [`DecodeError::MaterializationLimit`].
    ///
    /// [`DecodeError::MaterializationLimit`]: crate::DecodeError::MaterializationLimit
    pub max_materializations: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sideload: true,
            nest_embedded: false,
            max_include_depth: 32,
            max_materializations: 10_000,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sideload(mut self, sideload: bool) -> Self {
        self.sideload = sideload;
        self
    }

    pub fn nest_embedded(mut self, nest: bool) -> Self {
        self.nest_embedded = nest;
        self
    }

    pub fn max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    pub fn max_materializations(mut self, limit: usize) -> Self {
        self.max_materializations = limit;
        self
    }
}
