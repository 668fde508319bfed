//! Case-insensitive `*` / `?` wildcard matching.

/// A compiled wildcard pattern.  `*` matches any run of characters, `?`
/// matches exactly one; comparison is ASCII case-insensitive.  Intended to
/// be matched against the final path component of an entry.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    pattern: Vec<u8>,
}

impl WildcardPattern {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.bytes().map(|b| b.to_ascii_lowercase()).collect(),
        }
    }

    /// Greedy matcher with single-anchor backtracking: on a mismatch after a
    /// `*`, the subject advances one byte and the pattern rewinds to just
    /// past that star.
    pub fn matches(&self, name: &str) -> bool {
        let subject: Vec<u8> = name.bytes().map(|b| b.to_ascii_lowercase()).collect();
        let pattern = &self.pattern;

        let mut si = 0;
        let mut pi = 0;
        let mut anchor: Option<usize> = None;
        while si < subject.len() || pi < pattern.len() {
            match pattern.get(pi) {
                Some(b'?') => {
                    if si >= subject.len() {
                        return false;
                    }
                    si += 1;
                    pi += 1;
                }
                Some(b'*') => {
                    pi += 1;
                    anchor = Some(pi);
                }
                Some(&c) if si < subject.len() && subject[si] == c => {
                    si += 1;
                    pi += 1;
                }
                _ => match anchor {
                    // Pattern exhausted or mismatched with no star to fall
                    // back on.
                    None => return false,
                    Some(a) => {
                        if si >= subject.len() {
                            return false;
                        }
                        si += 1;
                        pi = a;
                    }
                },
            }
        }
        true
    }
}

/// Final component of a `/`-separated entry path.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
