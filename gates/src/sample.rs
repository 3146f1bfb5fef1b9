//! Sample references.
//!
//! Callers may name a sample instead of giving its id. Turning a name into an id
//! is the job of the host's lookup layer, reached through `SampleResolver`; its
//! errors pass through this crate unchanged.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    #[error("Sample name '{name}' matches {matches} samples")]
    AmbiguousSampleReference { name: String, matches: usize },

    #[error("No sample named '{name}'")]
    NoMatchingSample { name: String },
}

/// Resolves sample names to sample ids
pub trait SampleResolver {
    fn resolve_name(&self, name: &str) -> Result<String, SampleError>;
}

/// A sample given either by id or by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleRef {
    Id(String),
    Name(String),
}

impl SampleRef {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Return the id, asking `resolver` only for names
    pub fn resolve(&self, resolver: &dyn SampleResolver) -> Result<String, SampleError> {
        match self {
            SampleRef::Id(id) => Ok(id.clone()),
            SampleRef::Name(name) => resolver.resolve_name(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Panel(Vec<(&'static str, &'static str)>);

    impl SampleResolver for Panel {
        fn resolve_name(&self, name: &str) -> Result<String, SampleError> {
            let hits: Vec<_> = self.0.iter().filter(|(_, n)| *n == name).collect();
            match hits.as_slice() {
                [] => Err(SampleError::NoMatchingSample { name: name.into() }),
                [(id, _)] => Ok(id.to_string()),
                many => Err(SampleError::AmbiguousSampleReference {
                    name: name.into(),
                    matches: many.len(),
                }),
            }
        }
    }

    #[test]
    fn test_ids_bypass_the_resolver() {
        let panel = Panel(vec![]);
        assert_eq!(SampleRef::id("abc").resolve(&panel).unwrap(), "abc");
    }

    #[test]
    fn test_resolver_errors_pass_through() {
        let panel = Panel(vec![("1", "a.fcs"), ("2", "b.fcs"), ("3", "b.fcs")]);
        assert_eq!(SampleRef::name("a.fcs").resolve(&panel).unwrap(), "1");
        assert_eq!(
            SampleRef::name("b.fcs").resolve(&panel),
            Err(SampleError::AmbiguousSampleReference {
                name: "b.fcs".into(),
                matches: 2
            })
        );
        assert!(matches!(
            SampleRef::name("c.fcs").resolve(&panel),
            Err(SampleError::NoMatchingSample { .. })
        ));
    }
}
