use super::*;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalKey {
    pub entity_id: String,
    pub year: i32,
    pub statement: StatementKind,
    pub field: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct StoredValue {
    value: f64,
    rank: u8,
    source: SourceStrategy,
}

/// Batch-wide index of accepted values. An existing value is only replaced
/// by an observation with a strictly higher provenance rank.
#[derive(Debug, Default)]
pub struct Consolidator {
    index: BTreeMap<CanonicalKey, StoredValue>,
    overridden: usize,
}

impl Consolidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the observation became (or replaced) the stored
    /// value for its key.
    pub fn offer(&mut self, observation: &FieldObservation, registry: &mut EntityRegistry) -> bool {
        let (Some(field), Some(value)) = (observation.canonical_field, observation.value) else {
            return false;
        };
        if observation.statement == StatementKind::Unknown {
            return false;
        }

        let key = CanonicalKey {
            entity_id: registry.resolve(&observation.entity),
            year: observation.year,
            statement: observation.statement,
            field,
        };
        let incoming = StoredValue {
            value,
            rank: observation.provenance_rank,
            source: observation.source,
        };

        match self.index.get_mut(&key) {
            None => {
                self.index.insert(key, incoming);
                true
            }
            Some(stored) if incoming.rank > stored.rank => {
                debug!(
                    entity_id = %key.entity_id,
                    year = key.year,
                    field = key.field,
                    previous_source = stored.source.as_str(),
                    source = incoming.source.as_str(),
                    "higher-ranked observation replaced stored value"
                );
                *stored = incoming;
                self.overridden += 1;
                true
            }
            Some(_) => false,
        }
    }

    pub fn overridden_count(&self) -> usize {
        self.overridden
    }

    pub fn values(&self) -> BTreeMap<CanonicalKey, f64> {
        self.index
            .iter()
            .map(|(key, stored)| (key.clone(), stored.value))
            .collect()
    }

    pub fn source_of(&self, key: &CanonicalKey) -> Option<SourceStrategy> {
        self.index.get(key).map(|stored| stored.source)
    }
}

/// One-shot form over a fixed observation list.
#[cfg(test)]
pub fn consolidate(
    observations: &[FieldObservation],
    registry: &mut EntityRegistry,
) -> BTreeMap<CanonicalKey, f64> {
    let mut consolidator = Consolidator::new();
    for observation in observations {
        consolidator.offer(observation, registry);
    }
    consolidator.values()
}
