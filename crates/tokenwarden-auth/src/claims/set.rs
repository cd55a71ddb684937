//! Name-unique, insertion-ordered claim collection.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::Claim;
use crate::AuthResult;

/// An ordered collection of claims keyed by name.
///
/// Putting a claim whose name is already present replaces the earlier one in
/// place, so serialization order stays stable across overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimSet {
    claims: IndexMap<String, Claim>,
}

impl ClaimSet {
    /// Creates an empty claim set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a claim, returning the one it replaced.
    pub fn put(&mut self, claim: Claim) -> Option<Claim> {
        self.claims.insert(claim.name().to_string(), claim)
    }

    /// Builder form of [`ClaimSet::put`].
    #[must_use]
    pub fn with(mut self, claim: Claim) -> Self {
        self.put(claim);
        self
    }

    /// Looks up a claim by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Claim> {
        self.claims.get(name)
    }

    /// Looks up a claim's raw value by name.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.claims.get(name).map(Claim::value)
    }

    /// Returns `true` if a claim with this name is held.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.claims.contains_key(name)
    }

    /// Returns `true` if every name in `names` is held.
    ///
    /// An empty requirement is always satisfied.
    pub fn has_all<I, S>(&self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .all(|name| self.claims.contains_key(name.as_ref()))
    }

    /// Removes a claim, keeping the order of the rest.
    pub fn remove(&mut self, name: &str) -> Option<Claim> {
        self.claims.shift_remove(name)
    }

    /// Applies every claim of `other` on top of this set.
    pub fn merge(&mut self, other: ClaimSet) {
        for claim in other {
            self.put(claim);
        }
    }

    /// Builds a claim set from raw name/value pairs.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClaim` for the first value that fails its
    /// claim's rule.
    pub fn from_values<I, K>(values: I) -> AuthResult<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut set = Self::new();
        for (name, value) in values {
            set.put(Claim::new(name.as_ref(), value)?);
        }
        Ok(set)
    }

    /// Builds a claim set from a decoded JSON object.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClaim` for the first value that fails its
    /// claim's rule.
    pub fn from_map(map: Map<String, Value>) -> AuthResult<Self> {
        Self::from_values(map)
    }

    /// Returns the claims as a name to raw value map, in insertion order.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        self.claims
            .iter()
            .map(|(name, claim)| (name.clone(), claim.value().clone()))
            .collect()
    }

    /// Iterates over the held claim names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.claims.keys().map(String::as_str)
    }

    /// Iterates over the held claims in order.
    pub fn iter(&self) -> impl Iterator<Item = &Claim> {
        self.claims.values()
    }

    /// Number of claims held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Returns `true` if no claims are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

impl FromIterator<Claim> for ClaimSet {
    fn from_iter<T: IntoIterator<Item = Claim>>(iter: T) -> Self {
        let mut set = Self::new();
        for claim in iter {
            set.put(claim);
        }
        set
    }
}

impl Extend<Claim> for ClaimSet {
    fn extend<T: IntoIterator<Item = Claim>>(&mut self, iter: T) {
        for claim in iter {
            self.put(claim);
        }
    }
}

impl IntoIterator for ClaimSet {
    type Item = Claim;
    type IntoIter = indexmap::map::IntoValues<String, Claim>;

    fn into_iter(self) -> Self::IntoIter {
        self.claims.into_values()
    }
}

impl<'a> IntoIterator for &'a ClaimSet {
    type Item = &'a Claim;
    type IntoIter = indexmap::map::Values<'a, String, Claim>;

    fn into_iter(self) -> Self::IntoIter {
        self.claims.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use serde_json::json;

    fn sample() -> ClaimSet {
        ClaimSet::new()
            .with(Claim::subject(1).unwrap())
            .with(Claim::issuer("http://example.com").unwrap())
            .with(Claim::issued_at(100))
    }

    #[test]
    fn test_put_is_last_write_wins_in_place() {
        let mut set = sample();
        let replaced = set.put(Claim::subject(2).unwrap());

        assert_eq!(replaced.unwrap().value(), &json!(1));
        assert_eq!(set.value("sub"), Some(&json!(2)));
        assert_eq!(set.len(), 3);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["sub", "iss", "iat"]);
    }

    #[test]
    fn test_has_all() {
        let set = sample();
        assert!(set.has_all(["iat", "sub"]));
        assert!(!set.has_all(["sub", "exp"]));
        assert!(set.has_all(Vec::<String>::new()));
        assert!(ClaimSet::new().has_all(std::iter::empty::<&str>()));
    }

    #[test]
    fn test_merge_gives_precedence_to_other() {
        let mut defaults = ClaimSet::new()
            .with(Claim::jwt_id("a").unwrap())
            .with(Claim::issuer("default").unwrap());
        let custom = ClaimSet::new().with(Claim::issuer("custom").unwrap());

        defaults.merge(custom);
        assert_eq!(defaults.value("iss"), Some(&json!("custom")));
        assert_eq!(defaults.value("jti"), Some(&json!("a")));
    }

    #[test]
    fn test_from_map_validates_every_claim() {
        let map = json!({"sub": 1, "exp": 1234, "role": "admin"});
        let Value::Object(map) = map else { unreachable!() };
        let set = ClaimSet::from_map(map).unwrap();
        assert_eq!(set.get("exp").unwrap().as_timestamp(), Some(1234));

        let Value::Object(bad) = json!({"sub": 1, "exp": "1234567"}) else {
            unreachable!()
        };
        let err = ClaimSet::from_map(bad).unwrap_err();
        assert!(matches!(err, AuthError::InvalidClaim { .. }));
    }

    #[test]
    fn test_to_map_preserves_order_and_values() {
        let map = sample().to_map();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["sub", "iss", "iat"]);
        assert_eq!(Value::Object(map), json!({"sub": 1, "iss": "http://example.com", "iat": 100}));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut set = sample();
        assert!(set.remove("sub").is_some());
        assert!(set.remove("sub").is_none());
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["iss", "iat"]);
    }

    #[test]
    fn test_collect_and_iterate() {
        let set: ClaimSet = vec![Claim::not_before(1), Claim::not_before(2)]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 1);
        assert_eq!((&set).into_iter().next().unwrap().as_timestamp(), Some(2));
    }
}
