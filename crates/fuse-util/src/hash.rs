/// Compute a BLAKE3 digest over a sequence of string fields.
///
/// Each field is length-prefixed so `["ab", "c"]` and `["a", "bc"]` hash
/// differently.
#[must_use]
pub fn blake3_fields<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = blake3::Hasher::new();
    for field in fields {
        hasher.update(&(field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
