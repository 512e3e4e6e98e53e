use {
    serde::{Deserialize, Deserializer, Serialize, Serializer},
    std::{
        borrow::Cow,
        fmt::{self, Debug},
    },
};

/// Secret used to encrypt archive entries.
///
/// An empty password is representable so that it can be reported as a failed
/// invocation instead of being rejected while loading configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    #[must_use]
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    #[inline]
    pub fn as_unmasked_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Password {
    #[inline]
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Password {
    #[inline]
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl<'de> Deserialize<'de> for Password {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(Cow::<'_, str>::deserialize(deserializer)?.into_owned()))
    }
}

impl Serialize for Password {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl Debug for Password {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Password").finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn debug_is_masked() {
        let password = Password::new("hunter2");
        let debug = format!("{password:?}");
        assert!(!debug.contains("hunter2"));
        assert_eq!(password.as_unmasked_str(), "hunter2");
    }

    #[test]
    fn deserialize_from_string() {
        let password: Password = json5::from_str("\"s3cret\"").unwrap();
        assert_eq!(password.as_unmasked_str(), "s3cret");
        assert!(!password.is_empty());

        let empty: Password = json5::from_str("''").unwrap();
        assert!(empty.is_empty());
    }
}
