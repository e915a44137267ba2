//! Random credentials for new mailboxes.

use rand::Rng;

/// Characters a generated password is drawn from.
pub const PASSWORD_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*";

/// Characters a generated mailbox local part is drawn from.
pub const LOCAL_PART_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Password length used when registering a mailbox.
pub const DEFAULT_PASSWORD_LENGTH: usize = 12;

/// Length of a generated local part.
pub const LOCAL_PART_LENGTH: usize = 10;

/// Generate a random password of `length` characters.
pub fn generate_password(length: usize) -> String {
    sample(PASSWORD_CHARSET, length)
}

/// Generate the random part before the `@` of a new address.
pub fn generate_local_part() -> String {
    sample(LOCAL_PART_CHARSET, LOCAL_PART_LENGTH)
}

fn sample(charset: &[u8], length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| charset[rng.random_range(0..charset.len())] as char)
        .collect()
}
