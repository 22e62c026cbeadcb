use crate::error::RegistryError;
use crate::profile::UserBehaviorProfile;
use crate::user::checkout_user;
use std::sync::Arc;

/// User classes known to the driver, in registration order.
#[derive(Debug, Default)]
pub struct Registry {
    profiles: Vec<Arc<UserBehaviorProfile>>,
}

impl Registry {
    pub fn register(&mut self, profile: UserBehaviorProfile) -> Result<(), RegistryError> {
        if self.profiles.iter().any(|p| p.name() == profile.name()) {
            return Err(RegistryError::Duplicate(profile.name().to_string()));
        }
        self.profiles.push(Arc::new(profile));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<UserBehaviorProfile>, RegistryError> {
        self.profiles
            .iter()
            .find(|p| p.name() == name)
            .cloned()
            .ok_or_else(|| RegistryError::Unknown {
                name: name.to_string(),
                known: self.names().join(", "),
            })
    }

    /// The first registered class, picked when none is named.
    #[must_use]
    pub fn first(&self) -> Option<Arc<UserBehaviorProfile>> {
        self.profiles.first().cloned()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name()).collect()
    }
}

pub fn default_registry() -> anyhow::Result<Registry> {
    let mut registry = Registry::default();
    registry.register(checkout_user()?)?;
    Ok(registry)
}
