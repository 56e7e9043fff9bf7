//! Unique names for sandboxes and containers.

/// Source of unique name suffixes.
///
/// Scenarios running against a shared runtime must not collide on names, so
/// every sandbox and container name is a fixed prefix plus a fresh suffix.
pub trait NameGenerator: Send + Sync {
    /// Returns a suffix not returned before.
    fn unique_suffix(&self) -> String;

    /// Returns `prefix` followed by a fresh suffix.
    fn name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.unique_suffix())
    }
}

/// Random v4 UUID suffixes.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidNames;

impl NameGenerator for UuidNames {
    fn unique_suffix(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_keep_prefix_and_differ() {
        let a = UuidNames.name("container-");
        let b = UuidNames.name("container-");
        assert!(a.starts_with("container-"));
        assert_ne!(a, b);
    }
}
