//! Execution identities.
//!
//! Every coordinator call mints one identity. It is written as the lock value
//! to prove ownership and it suffixes the result key the leader publishes to.

use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use dsf_core::{DsfError, DsfResult};
use uuid::{Builder, Uuid};

/// Length of an encoded execution identity.
pub const EXECUTION_ID_ENCODED_LEN: usize = 22;

/// Time-ordered 128-bit identity, encoded as unpadded URL-safe base64.
///
/// The encoded alphabet is `[A-Za-z0-9_-]`, so the text never contains a
/// key scheme delimiter and can be embedded in derived keys unescaped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutionId {
    uuid: Uuid,
    encoded: String,
}

impl ExecutionId {
    /// Generates a fresh UUIDv7 identity from the system clock and OS entropy.
    pub fn generate() -> DsfResult<Self> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|error| DsfError::Identity(format!("system clock is before epoch: {error}")))?;
        let millis = u64::try_from(elapsed.as_millis())
            .map_err(|error| DsfError::Identity(format!("system clock out of range: {error}")))?;

        let mut random_bytes = [0_u8; 10];
        getrandom::fill(&mut random_bytes).map_err(|error| {
            DsfError::Identity(format!("failed to read entropy for execution id: {error}"))
        })?;

        let uuid = Builder::from_unix_timestamp_millis(millis, &random_bytes).into_uuid();
        Ok(Self::from_uuid(uuid))
    }

    /// Wraps an existing UUID value.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            encoded: URL_SAFE_NO_PAD.encode(uuid.as_bytes()),
        }
    }

    /// Parses an encoded identity, typically a lock owner read from the store.
    pub fn parse(value: &str) -> DsfResult<Self> {
        if value.len() != EXECUTION_ID_ENCODED_LEN {
            return Err(DsfError::Validation(format!(
                "execution id '{value}' must be {EXECUTION_ID_ENCODED_LEN} characters"
            )));
        }

        let bytes = URL_SAFE_NO_PAD.decode(value.as_bytes()).map_err(|error| {
            DsfError::Validation(format!("invalid execution id '{value}': {error}"))
        })?;
        let uuid = Uuid::from_slice(bytes.as_slice()).map_err(|error| {
            DsfError::Validation(format!("invalid execution id '{value}': {error}"))
        })?;

        Ok(Self {
            uuid,
            encoded: value.to_owned(),
        })
    }

    /// Returns the encoded text form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.encoded.as_str()
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.uuid
    }

    /// Returns the raw 16 identity bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 16] {
        *self.uuid.as_bytes()
    }
}

impl Display for ExecutionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.encoded.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{EXECUTION_ID_ENCODED_LEN, ExecutionId};

    fn generate() -> ExecutionId {
        match ExecutionId::generate() {
            Ok(id) => id,
            Err(error) => panic!("failed to generate execution id: {error}"),
        }
    }

    #[test]
    fn generated_ids_are_unique() {
        let ids: HashSet<String> = (0..2_000).map(|_| generate().as_str().to_owned()).collect();
        assert_eq!(ids.len(), 2_000);
    }

    #[test]
    fn generated_ids_use_delimiter_free_alphabet() {
        let id = generate();
        assert_eq!(id.as_str().len(), EXECUTION_ID_ENCODED_LEN);
        assert!(
            id.as_str()
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        );
    }

    #[test]
    fn generated_ids_are_time_ordered_uuid_v7() {
        let id = generate();
        assert_eq!(id.as_uuid().get_version_num(), 7);
    }

    #[test]
    fn parse_decodes_to_the_same_bytes() {
        let id = generate();
        let parsed = ExecutionId::parse(id.as_str());
        assert!(parsed.is_ok());

        let parsed = parsed.unwrap_or_else(|_| unreachable!());
        assert_eq!(parsed.to_bytes(), id.to_bytes());
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_malformed_owner_values() {
        assert!(ExecutionId::parse("").is_err());
        assert!(ExecutionId::parse("not-an-id").is_err());
        assert!(ExecutionId::parse("??????????????????????").is_err());
    }
}
