use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::distributions::{Alphanumeric, DistString};
use rand::{Rng, RngCore};
use sha2::Sha256;
use subtle::ConstantTimeEq;

const HASH_SCHEME: &str = "pbkdf2-sha256";
pub const PBKDF2_ITERATIONS: u32 = 210_000;
const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;

pub const PASSWORD_LENGTH: usize = 10;
pub const RESET_KEY_LENGTH: usize = 20;

/// Random alphanumeric password for accounts created by the bootstrap
pub fn generate_password() -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), PASSWORD_LENGTH)
}

/// Random numeric reset key
pub fn generate_reset_key() -> String {
    let mut rng = rand::thread_rng();
    (0..RESET_KEY_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Hash a password as `pbkdf2-sha256$<iterations>$<salt>$<hash>` (base64 parts)
pub fn hash_password(password: &str) -> String {
    hash_password_with_iterations(password, PBKDF2_ITERATIONS)
}

pub fn hash_password_with_iterations(password: &str, iterations: u32) -> String {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hash = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut hash);

    format!(
        "{}${}${}${}",
        HASH_SCHEME,
        iterations,
        STANDARD.encode(salt),
        STANDARD.encode(hash)
    )
}

/// Check `password` against a stored hash; malformed hashes never match
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    if scheme != HASH_SCHEME {
        return false;
    }
    let (Ok(iterations), Ok(salt), Ok(expected)) = (
        iterations.parse::<u32>(),
        STANDARD.decode(salt),
        STANDARD.decode(expected),
    ) else {
        return false;
    };
    if expected.len() != HASH_LENGTH || iterations == 0 {
        return false;
    }

    let mut actual = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut actual);
    actual[..].ct_eq(&expected[..]).into()
}
