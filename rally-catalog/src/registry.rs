use crate::location::LocationConfig;
use rally_shared::Money;

/// A session's venue as resolved against the registry at read time.
#[derive(Debug, Clone, PartialEq)]
pub enum Venue<'a> {
    Registered(&'a LocationConfig),
    /// Free-text venue with no registry entry (deleted or never added).
    Unregistered(String),
}

impl Venue<'_> {
    pub fn name(&self) -> &str {
        match self {
            Venue::Registered(loc) => &loc.name,
            Venue::Unregistered(name) => name,
        }
    }

    /// Hourly court rate, only known for registered venues.
    pub fn rate(&self) -> Option<Money> {
        match self {
            Venue::Registered(loc) => Some(loc.default_court_fee),
            Venue::Unregistered(_) => None,
        }
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, Venue::Registered(_))
    }
}

/// In-memory view of the configured venues.
#[derive(Debug, Clone, Default)]
pub struct LocationRegistry {
    locations: Vec<LocationConfig>,
}

impl LocationRegistry {
    pub fn new(locations: Vec<LocationConfig>) -> Self {
        Self { locations }
    }

    pub fn with_defaults() -> Self {
        Self::new(LocationConfig::defaults())
    }

    pub fn all(&self) -> &[LocationConfig] {
        &self.locations
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn first(&self) -> Option<&LocationConfig> {
        self.locations.first()
    }

    pub fn get(&self, id: &str) -> Option<&LocationConfig> {
        self.locations.iter().find(|l| l.id == id)
    }

    /// Match by exact venue name; names are the soft reference sessions hold.
    pub fn resolve(&self, name: &str) -> Venue<'_> {
        match self.locations.iter().find(|l| l.name == name) {
            Some(loc) => Venue::Registered(loc),
            None => Venue::Unregistered(name.to_string()),
        }
    }

    pub fn add(&mut self, name: &str, rate: Money) -> Result<&LocationConfig, RegistryError> {
        let name = Self::validate(name, rate)?;
        if self.locations.iter().any(|l| l.name == name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.locations.push(LocationConfig::new(name, rate));
        self.locations
            .last()
            .ok_or_else(|| RegistryError::NotFound("new location".to_string()))
    }

    /// Rename and/or re-rate an existing venue. Sessions keep their stored fee.
    pub fn update(&mut self, id: &str, name: &str, rate: Money) -> Result<(), RegistryError> {
        let name = Self::validate(name, rate)?;
        if self.locations.iter().any(|l| l.name == name && l.id != id) {
            return Err(RegistryError::DuplicateName(name));
        }
        let loc = self.locations.iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        loc.name = name;
        loc.default_court_fee = rate;
        Ok(())
    }

    /// Insert or replace by id, keeping the caller's id. Used for bulk saves.
    pub fn upsert(&mut self, location: LocationConfig) -> Result<(), RegistryError> {
        let name = Self::validate(&location.name, location.default_court_fee)?;
        if self.locations.iter().any(|l| l.name == name && l.id != location.id) {
            return Err(RegistryError::DuplicateName(name));
        }
        let location = LocationConfig { name, ..location };
        match self.locations.iter_mut().find(|l| l.id == location.id) {
            Some(existing) => *existing = location,
            None => self.locations.push(location),
        }
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<LocationConfig> {
        let index = self.locations.iter().position(|l| l.id == id)?;
        Some(self.locations.remove(index))
    }

    pub fn reset_to_defaults(&mut self) {
        self.locations = LocationConfig::defaults();
    }

    pub fn into_vec(self) -> Vec<LocationConfig> {
        self.locations
    }

    fn validate(name: &str, rate: Money) -> Result<String, RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if rate.is_negative() {
            return Err(RegistryError::NegativeRate(rate));
        }
        Ok(name.to_string())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RegistryError {
    #[error("Location name must not be empty")]
    EmptyName,

    #[error("Location rate must not be negative: {0}")]
    NegativeRate(Money),

    #[error("Location already exists: {0}")]
    DuplicateName(String),

    #[error("Location not found: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_registered_and_unregistered() {
        let registry = LocationRegistry::with_defaults();

        let src = registry.resolve("SRC");
        assert!(src.is_registered());
        assert_eq!(src.rate(), Some(Money::from_cents(2000)));

        let custom = registry.resolve("Community Hall");
        assert_eq!(custom, Venue::Unregistered("Community Hall".to_string()));
        assert_eq!(custom.rate(), None);
        assert_eq!(custom.name(), "Community Hall");
    }

    #[test]
    fn test_add_update_remove() {
        let mut registry = LocationRegistry::default();
        let id = registry.add("  Arena  ", Money::from_cents(2500)).unwrap().id.clone();
        assert_eq!(registry.resolve("Arena").rate(), Some(Money::from_cents(2500)));

        registry.update(&id, "Arena 2", Money::from_cents(2800)).unwrap();
        assert!(!registry.resolve("Arena").is_registered());
        assert_eq!(registry.get(&id).unwrap().name, "Arena 2");

        assert!(registry.remove(&id).is_some());
        assert!(registry.is_empty());
        assert!(registry.remove(&id).is_none());
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut registry = LocationRegistry::with_defaults();
        assert_eq!(registry.add("   ", Money::ZERO).unwrap_err(), RegistryError::EmptyName);
        assert!(matches!(
            registry.add("Hall", Money::from_cents(-1)),
            Err(RegistryError::NegativeRate(_))
        ));
        assert!(matches!(
            registry.add("SRC", Money::from_cents(100)),
            Err(RegistryError::DuplicateName(_))
        ));
        assert!(matches!(
            registry.update("missing", "X", Money::ZERO),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_upsert_keeps_ids() {
        let mut registry = LocationRegistry::with_defaults();
        let src_id = registry.all()[0].id.clone();

        registry
            .upsert(LocationConfig::with_id(src_id.clone(), " SRC Hall ", Money::from_cents(2200)))
            .unwrap();
        assert_eq!(registry.get(&src_id).unwrap().name, "SRC Hall");
        assert_eq!(registry.all().len(), 2);

        registry.upsert(LocationConfig::with_id("x1", "Arena", Money::ZERO)).unwrap();
        assert_eq!(registry.all().len(), 3);
        assert!(matches!(
            registry.upsert(LocationConfig::with_id("x2", "Arena", Money::ZERO)),
            Err(RegistryError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_reset_to_defaults() {
        let mut registry = LocationRegistry::default();
        registry.reset_to_defaults();
        assert_eq!(registry.all().len(), 2);
        assert_eq!(registry.first().unwrap().name, "SRC");
    }
}
