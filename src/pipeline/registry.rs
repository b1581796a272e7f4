//! Run-time catalog of stages keyed by validated ids.

use super::step::StepHandle;
use crate::error::{PipelineError, Result};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::any::{Any, type_name};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Stable stage name: non-empty, lower-case ASCII letters, digits and `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(String);

impl StepId {
    pub fn parse(id: &str) -> Result<Self> {
        let valid = !id.is_empty()
            && !id.starts_with('-')
            && id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if valid {
            Ok(Self(id.to_string()))
        } else {
            Err(PipelineError::InvalidStepId(id.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for StepId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type Instance = Arc<dyn Any + Send + Sync>;
type Constructor = Box<dyn Fn() -> Result<Instance> + Send + Sync>;

struct Entry {
    signature: String,
    constructor: Constructor,
    instance: OnceCell<Instance>,
}

/// Append-only catalog of stage factories, keyed by [`StepId`].
///
/// Constructors run on first resolution and the instance is cached for the
/// lifetime of the registry. Concurrent first resolutions of one id run the
/// constructor once.
#[derive(Default)]
pub struct StepsRegistry {
    entries: RwLock<HashMap<StepId, Arc<Entry>>>,
}

impl StepsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the factory for `id`. An id can be registered only once.
    pub fn register<I, O, F>(&self, id: &str, constructor: F) -> Result<()>
    where
        I: 'static,
        O: 'static,
        F: Fn() -> Result<StepHandle<I, O>> + Send + Sync + 'static,
    {
        let id = StepId::parse(id)?;
        let mut entries = self.entries.write();
        if entries.contains_key(&id) {
            return Err(PipelineError::DuplicateStep(id.to_string()));
        }

        let signature = format!("{} -> {}", type_name::<I>(), type_name::<O>());
        debug!(step = %id, %signature, "registered step");
        let entry = Entry {
            signature,
            constructor: Box::new(move || {
                let handle = constructor()?;
                Ok(Arc::new(handle) as Instance)
            }),
            instance: OnceCell::new(),
        };
        entries.insert(id, Arc::new(entry));
        Ok(())
    }

    /// Returns the step registered under `id`, constructing it on first use.
    ///
    /// Any id that was never registered, well-formed or not, is an
    /// `UnknownStep`.
    pub fn resolve<I, O>(&self, id: &str) -> Result<StepHandle<I, O>>
    where
        I: 'static,
        O: 'static,
    {
        let entry = self
            .entries
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownStep(id.to_string()))?;

        let instance = entry.instance.get_or_try_init(|| {
            info!(step = id, signature = %entry.signature, "constructing step");
            (entry.constructor)()
        })?;

        instance
            .downcast_ref::<StepHandle<I, O>>()
            .cloned()
            .ok_or_else(|| PipelineError::StepTypeMismatch { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<StepId> {
        let mut ids: Vec<_> = self.entries.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::step::{Cardinality, OneToOne};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Double;

    #[async_trait]
    impl OneToOne<u32, u32> for Double {
        async fn apply(&self, input: u32) -> Result<u32> {
            Ok(input * 2)
        }
    }

    fn call(handle: &StepHandle<u32, u32>) -> Arc<dyn OneToOne<u32, u32>> {
        match handle {
            StepHandle::OneToOne(step) => step.clone(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_step_id_validation() {
        assert!(StepId::parse("send-payment").is_ok());
        assert!(StepId::parse("stage2").is_ok());
        assert!(matches!(
            StepId::parse(""),
            Err(PipelineError::InvalidStepId(_))
        ));
        assert!(StepId::parse("Send").is_err());
        assert!(StepId::parse("a.b.C").is_err());
        assert!(StepId::parse("-lead").is_err());
    }

    #[tokio::test]
    async fn test_resolve_is_lazy_and_cached() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let registry = StepsRegistry::new();
        registry
            .register("double", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(StepHandle::one_to_one(Double))
            })
            .unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 0);

        let first = registry.resolve::<u32, u32>("double").unwrap();
        let second = registry.resolve::<u32, u32>("double").unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(first.cardinality(), Cardinality::OneToOne);
        assert_eq!(call(&first).apply(4).await.unwrap(), 8);
        assert_eq!(call(&second).apply(4).await.unwrap(), 8);
    }

    #[test]
    fn test_unknown_step() {
        let registry = StepsRegistry::new();
        for id in ["missing", "Not A Valid Id", ""] {
            assert!(matches!(
                registry.resolve::<u32, u32>(id),
                Err(PipelineError::UnknownStep(_))
            ));
        }
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let registry = StepsRegistry::new();
        registry
            .register("double", || Ok(StepHandle::one_to_one(Double)))
            .unwrap();
        let _ = registry.resolve::<u32, u32>("double").unwrap();
        let again = registry.register("double", || Ok(StepHandle::one_to_one(Double)));
        assert!(matches!(again, Err(PipelineError::DuplicateStep(_))));
        assert_eq!(registry.ids().len(), 1);
    }

    #[test]
    fn test_resolve_with_wrong_types() {
        let registry = StepsRegistry::new();
        registry
            .register("double", || Ok(StepHandle::one_to_one(Double)))
            .unwrap();
        assert!(matches!(
            registry.resolve::<String, u32>("double"),
            Err(PipelineError::StepTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_failed_construction_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let registry = StepsRegistry::new();
        registry
            .register("flaky", move || {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(PipelineError::Config("not yet".into()))
                } else {
                    Ok(StepHandle::one_to_one(Double))
                }
            })
            .unwrap();

        assert!(registry.resolve::<u32, u32>("flaky").is_err());
        assert!(registry.resolve::<u32, u32>("flaky").is_ok());
        assert!(registry.contains("flaky"));
    }
}
