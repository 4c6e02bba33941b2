use crate::error::AppError;

/// Largest accepted size of a single text or image field, in bytes.
pub const MAX_FIELD_BYTES: usize = 15 * 1024 * 1024;

/// Byte size of a field value once encoded as UTF-8.
/// Sequences count the sum of their elements.
pub trait PayloadSize {
    fn payload_bytes(&self) -> usize;
}

impl PayloadSize for str {
    fn payload_bytes(&self) -> usize {
        self.len()
    }
}

impl PayloadSize for String {
    fn payload_bytes(&self) -> usize {
        self.len()
    }
}

impl<T: PayloadSize> PayloadSize for [T] {
    fn payload_bytes(&self) -> usize {
        self.iter().map(PayloadSize::payload_bytes).sum()
    }
}

impl<T: PayloadSize> PayloadSize for Vec<T> {
    fn payload_bytes(&self) -> usize {
        self.as_slice().payload_bytes()
    }
}

impl<T: PayloadSize> PayloadSize for Option<T> {
    fn payload_bytes(&self) -> usize {
        self.as_ref().map_or(0, PayloadSize::payload_bytes)
    }
}

/// Rejects `value` when it is larger than [`MAX_FIELD_BYTES`].
pub fn ensure_field_size<T>(field: &str, value: &T) -> Result<(), AppError>
where
    T: PayloadSize + ?Sized,
{
    let size = value.payload_bytes();
    if size > MAX_FIELD_BYTES {
        tracing::debug!(field, size, "field over size limit");
        return Err(AppError::PayloadTooLarge(format!(
            "Input size must be less than 15MB ({} is {} bytes)",
            field, size
        )));
    }
    Ok(())
}
