//! Password strength checks and bcrypt hashing.

use std::fmt::Display;

use zxcvbn::{Score, feedback::Feedback, zxcvbn};

use crate::Error;

/// A password that passed the strength check but has not been hashed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPassword(String);

impl ValidatedPassword {
    /// Check that `raw_password` is hard to guess.
    ///
    /// `context` holds user specific words, such as the email address, that should not make up
    /// the password.
    ///
    /// # Errors
    ///
    /// Returns [Error::TooWeak] with zxcvbn's suggestions if the password scores below three.
    pub fn new(raw_password: &str, context: &[&str]) -> Result<Self, Error> {
        let analysis = zxcvbn(raw_password, context);

        match analysis.score() {
            Score::Three | Score::Four => Ok(Self(raw_password.to_owned())),
            _ => Err(Error::TooWeak(
                analysis
                    .feedback()
                    .unwrap_or(&Feedback::default())
                    .to_string(),
            )),
        }
    }
}

impl Display for ValidatedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("********")
    }
}

/// A salted bcrypt hash of a password.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// The bcrypt cost used by the server.
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Hash `password` with `cost` rounds.
    ///
    /// # Errors
    ///
    /// Returns [Error::HashingError] if bcrypt fails, e.g. because `cost` is out of range.
    pub fn new(password: &ValidatedPassword, cost: u32) -> Result<Self, Error> {
        bcrypt::hash(&password.0, cost)
            .map(Self)
            .map_err(|error| Error::HashingError(error.to_string()))
    }

    /// Wrap a hash read back from the database.
    pub fn new_unchecked(raw_hash: &str) -> Self {
        Self(raw_hash.to_owned())
    }

    /// Check `raw_password` against the hash.
    ///
    /// # Errors
    ///
    /// Returns [Error::HashingError] if the stored hash is malformed.
    pub fn verify(&self, raw_password: &str) -> Result<bool, Error> {
        bcrypt::verify(raw_password, &self.0).map_err(|error| Error::HashingError(error.to_string()))
    }
}

impl Display for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use crate::Error;

    use super::{PasswordHash, ValidatedPassword};

    #[test]
    fn rejects_weak_passwords() {
        for password in ["", "password1234", "imtooshort"] {
            let result = ValidatedPassword::new(password, &[]);

            assert!(matches!(result, Err(Error::TooWeak(_))), "{password:?}");
        }
    }

    #[test]
    fn rejects_password_built_from_context() {
        let result = ValidatedPassword::new("maria.silva@example.com", &["maria.silva@example.com"]);

        assert!(matches!(result, Err(Error::TooWeak(_))));
    }

    #[test]
    fn hash_verifies_only_the_original_password() {
        let password = ValidatedPassword::new("roostersgocockledoodledoo", &[]).unwrap();
        let hash = PasswordHash::new(&password, 4).unwrap();

        assert_eq!(hash.verify("roostersgocockledoodledoo"), Ok(true));
        assert_eq!(hash.verify("the_wrong_password"), Ok(false));
    }

    #[test]
    fn hashes_are_salted() {
        let password = ValidatedPassword::new("turkeysgogobblegobble", &[]).unwrap();

        let hash = PasswordHash::new(&password, 4).unwrap();
        let dupe_hash = PasswordHash::new(&password, 4).unwrap();

        assert_ne!(hash, dupe_hash);
    }

    #[test]
    fn display_hides_password() {
        let password = ValidatedPassword::new("thisisaverysecurepassword!!!!", &[]).unwrap();

        assert_eq!(password.to_string(), "********");
    }
}
