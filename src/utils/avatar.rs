/// Gravatar identicon for an email address. Gravatar keys on the MD5 of the
/// trimmed, lowercased address.
pub fn gravatar_url(email: &str, size: u32) -> String {
    let digest = md5::compute(email.trim().to_lowercase().as_bytes());
    format!("https://www.gravatar.com/avatar/{digest:x}?d=identicon&s={size}")
}
