//! Non-owning references between resources.
//!
//! Attribute records never hold [`Resource`] handles. A page that mentions
//! another entity stores a [`Link`] instead: the identity plus the seed
//! record parsed from the mention. Getters turn stored values back into
//! shared handles through [`Resolve`], so resource state lives exactly as
//! long as some caller holds a handle on it.

use crate::error::Result;
use crate::models::ListEntry;
use crate::resource::{Entity, Resource};
use crate::session::Session;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Reference to another resource, as kept inside attribute records.
///
/// Equality and hashing use only the kind and identity, like [`Resource`].
pub struct Link<E: Entity> {
    id: E::Id,
    seed: Box<E::Attributes>,
}

impl<E: Entity> Link<E> {
    /// Reference to `id`, carrying what the mentioning page said about it.
    pub(crate) fn new(id: E::Id, seed: E::Attributes) -> Result<Self> {
        E::validate(&id)?;
        Ok(Self {
            id,
            seed: Box::new(seed),
        })
    }

    /// Identity of the referenced resource.
    pub fn id(&self) -> &E::Id {
        &self.id
    }

    /// Attributes parsed from the mention.
    pub fn seed(&self) -> &E::Attributes {
        &self.seed
    }
}

impl<E: Entity> Clone for Link<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            seed: self.seed.clone(),
        }
    }
}

impl<E: Entity> PartialEq for Link<E> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<E: Entity> Eq for Link<E> {}

impl<E: Entity> Hash for Link<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        E::KIND.hash(state);
        self.id.hash(state);
    }
}

impl<E: Entity> fmt::Debug for Link<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", E::KIND, self.id)
    }
}

/// Conversion from a stored attribute value to the value getters return.
pub trait Resolve {
    type Output;

    /// Intern every link in `session`, seeding handles that are still unset.
    fn resolve(&self, session: &Session) -> Result<Self::Output>;
}

impl<E: Entity> Resolve for Link<E> {
    type Output = Resource<E>;

    fn resolve(&self, session: &Session) -> Result<Resource<E>> {
        Ok(session
            .resource::<E>(self.id.clone())?
            .seed((*self.seed).clone()))
    }
}

impl<T: Resolve> Resolve for Vec<T> {
    type Output = Vec<T::Output>;

    fn resolve(&self, session: &Session) -> Result<Self::Output> {
        self.iter().map(|item| item.resolve(session)).collect()
    }
}

impl<K, V> Resolve for HashMap<K, V>
where
    K: Resolve,
    K::Output: Eq + Hash,
    V: Resolve,
{
    type Output = HashMap<K::Output, V::Output>;

    fn resolve(&self, session: &Session) -> Result<Self::Output> {
        self.iter()
            .map(|(key, value)| Ok((key.resolve(session)?, value.resolve(session)?)))
            .collect()
    }
}

/// Plain values resolve to a copy of themselves.
macro_rules! resolved_as_is {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Resolve for $ty {
                type Output = $ty;

                fn resolve(&self, _session: &Session) -> Result<$ty> {
                    Ok(self.clone())
                }
            }
        )*
    };
}

resolved_as_is!(String, HashSet<String>, ListEntry);
