use argon2::{
    Algorithm, Argon2, ParamsBuilder, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash, password_hash::SaltString,
};
use rand::RngCore;

use crate::auth::config::HashingConfig;
use crate::auth::{AuthError, AuthResult};

const SALT_LEN: usize = 16;

/// One-way credential hashing with deployment-tunable Argon2id costs.
/// Plaintext passwords exist only transiently in request handling; only the
/// PHC-encoded hash is ever stored.
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    /// Build the hasher from the configured cost parameters.
    pub fn from_config(config: &HashingConfig) -> AuthResult<Self> {
        let mut builder = ParamsBuilder::new();
        builder.m_cost(config.memory_kib);
        builder.t_cost(config.iterations);
        builder.p_cost(config.parallelism);
        let params = builder.build().map_err(AuthError::from)?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password under a fresh random salt. The cost
    /// parameters travel inside the PHC string, so hashes stay verifiable
    /// after a cost reconfiguration.
    pub fn hash_password(&self, password: &str) -> AuthResult<String> {
        let salt = generate_salt()?;
        let hash = self.argon2.hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Check a plaintext password against a stored hash.
    pub fn verify_password(&self, password: &str, encoded: &str) -> AuthResult<bool> {
        let parsed = PasswordHash::new(encoded)?;
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            // A clean mismatch is a negative answer, not a fault.
            Err(password_hash::Error::Password) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

fn generate_salt() -> AuthResult<SaltString> {
    let mut bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    SaltString::encode_b64(&bytes).map_err(AuthError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_service() -> PasswordService {
        let config = HashingConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        };
        PasswordService::from_config(&config).expect("password service")
    }

    #[test]
    fn hashes_and_verifies_passwords() {
        let service = cheap_service();
        let hash = service
            .hash_password("correct-horse")
            .expect("hash generation");
        assert!(
            service
                .verify_password("correct-horse", &hash)
                .expect("verify succeeds")
        );
        assert!(
            !service
                .verify_password("wrong-staple", &hash)
                .expect("verify runs")
        );
    }

    #[test]
    fn same_password_hashes_differently() {
        let service = cheap_service();
        let first = service.hash_password("repeatable").expect("hash");
        let second = service.hash_password("repeatable").expect("hash");
        assert_ne!(first, second);
    }

    #[test]
    fn configured_costs_are_embedded_in_the_hash() {
        let hash = cheap_service().hash_password("any-password").expect("hash");
        assert!(hash.contains("m=1024,t=1,p=1"));
    }

    #[test]
    fn verification_reads_costs_from_the_stored_hash() {
        let hash = cheap_service().hash_password("portable").expect("hash");
        let default_service =
            PasswordService::from_config(&HashingConfig::default()).expect("password service");
        assert!(
            default_service
                .verify_password("portable", &hash)
                .expect("verify succeeds")
        );
    }

    #[test]
    fn garbage_stored_hash_is_an_error() {
        let service = cheap_service();
        assert!(
            service
                .verify_password("anything", "not-a-phc-string")
                .is_err()
        );
    }
}
