//! Store key derivation for lock and result entries.

use std::fmt::{Display, Formatter};

use dsf_core::{DsfError, DsfResult};

use crate::ExecutionId;

/// Prefix shared by every key the coordinator writes.
pub const KEY_SCHEME_PREFIX: &str = "dsf://";

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "default";

const RESERVED_NAMESPACE_CHARS: [char; 4] = ['/', '?', '=', '&'];

/// Coordinator-wide key namespace.
///
/// Reserved characters are rejected so the namespace segment always ends at
/// the first `/` after the scheme prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    /// Creates a validated namespace.
    pub fn new(value: impl Into<String>) -> DsfResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(DsfError::Validation(
                "namespace must not be empty".to_owned(),
            ));
        }

        if let Some(invalid) = value
            .chars()
            .find(|ch| ch.is_whitespace() || RESERVED_NAMESPACE_CHARS.contains(ch))
        {
            return Err(DsfError::Validation(format!(
                "namespace '{value}' must not contain '{invalid}'"
            )));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self(DEFAULT_NAMESPACE.to_owned())
    }
}

impl Display for Namespace {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Key holding the identity that currently owns a job key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey(String);

impl LockKey {
    /// Derives the lock key for one job key.
    #[must_use]
    pub fn new(namespace: &Namespace, job_key: &str) -> Self {
        Self(format!("{KEY_SCHEME_PREFIX}{namespace}/?k={job_key}"))
    }

    /// Returns the store key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for LockKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Key holding the output published by one leader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultKey(String);

impl ResultKey {
    /// Derives the result key for one execution identity.
    #[must_use]
    pub fn new(namespace: &Namespace, execution_id: &ExecutionId) -> Self {
        Self(format!("{KEY_SCHEME_PREFIX}{namespace}/?t={execution_id}"))
    }

    /// Returns the store key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for ResultKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use uuid::Uuid;

    use super::{LockKey, Namespace, ResultKey};
    use crate::ExecutionId;

    fn namespace(value: &str) -> Namespace {
        match Namespace::new(value) {
            Ok(namespace) => namespace,
            Err(error) => panic!("invalid test namespace '{value}': {error}"),
        }
    }

    #[test]
    fn lock_key_uses_scheme_prefix() {
        let key = LockKey::new(&Namespace::default(), "foobar");
        assert_eq!(key.as_str(), "dsf://default/?k=foobar");
    }

    #[test]
    fn result_key_embeds_execution_id() {
        let execution_id = ExecutionId::from_uuid(Uuid::nil());
        let key = ResultKey::new(&namespace("billing"), &execution_id);
        assert_eq!(key.as_str(), "dsf://billing/?t=AAAAAAAAAAAAAAAAAAAAAA");
    }

    #[test]
    fn namespace_rejects_reserved_characters() {
        assert!(Namespace::new("").is_err());
        assert!(Namespace::new("a/b").is_err());
        assert!(Namespace::new("a?k=b").is_err());
        assert!(Namespace::new("with space").is_err());
        assert!(Namespace::new("tenant-1.jobs").is_ok());
    }

    #[test]
    fn lock_and_result_keys_never_collide() {
        let execution_id = ExecutionId::from_uuid(Uuid::nil());
        let lock_key = LockKey::new(&Namespace::default(), execution_id.as_str());
        let result_key = ResultKey::new(&Namespace::default(), &execution_id);
        assert_ne!(lock_key.as_str(), result_key.as_str());
    }

    proptest! {
        #[test]
        fn lock_key_is_injective_in_job_key(left in ".*", right in ".*") {
            prop_assume!(left != right);
            let namespace = Namespace::default();
            prop_assert_ne!(
                LockKey::new(&namespace, &left),
                LockKey::new(&namespace, &right)
            );
        }

        #[test]
        fn lock_keys_are_disjoint_across_namespaces(
            left_namespace in "[a-z0-9._-]{1,12}",
            right_namespace in "[a-z0-9._-]{1,12}",
            left_job in ".*",
            right_job in ".*",
        ) {
            prop_assume!(left_namespace != right_namespace);
            prop_assert_ne!(
                LockKey::new(&namespace(&left_namespace), &left_job),
                LockKey::new(&namespace(&right_namespace), &right_job)
            );
        }
    }
}
