use super::*;

const ENTITY_ID_PREFIX: &str = "ent-";
const INITIAL_HASH_CHARS: usize = 12;
const HASH_EXTENSION_CHARS: usize = 4;

/// Name to synthetic id table shared by every document in a batch and
/// persisted between runs.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    by_name: BTreeMap<String, String>,
    taken: HashMap<String, String>,
}

impl EntityRegistry {
    pub fn load(path: &Path) -> Result<Self> {
        let mut registry = Self::default();
        if !path.exists() {
            return Ok(registry);
        }

        let stored: BTreeMap<String, String> = read_json(path)?;
        for (name, id) in stored {
            registry.taken.insert(id.clone(), name.clone());
            registry.by_name.insert(name, id);
        }

        debug!(path = %path.display(), entities = registry.len(), "loaded entity map");
        Ok(registry)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_pretty(path, &self.by_name)
    }

    pub fn resolve(&mut self, name: &str) -> String {
        if let Some(id) = self.by_name.get(name) {
            return id.clone();
        }

        let digest = sha256_hex(name);
        let mut width = INITIAL_HASH_CHARS;
        let id = loop {
            let candidate = format!("{ENTITY_ID_PREFIX}{}", &digest[..width.min(digest.len())]);
            let collides = self
                .taken
                .get(&candidate)
                .is_some_and(|owner| owner != name);
            if !collides || width >= digest.len() {
                break candidate;
            }
            width += HASH_EXTENSION_CHARS;
        };

        self.taken.insert(id.clone(), name.to_string());
        self.by_name.insert(name.to_string(), id.clone());
        id
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_name
            .iter()
            .map(|(name, id)| (name.as_str(), id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }
}
