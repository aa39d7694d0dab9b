//! Conversion of HTTP-layer failures into [`TransportError`] values.
//!
//! Hyper reports connection resets and refusals as opaque errors with the
//! underlying `io::Error` somewhere in the source chain. Classification keeps
//! that kind so the dispatcher can tell an unreachable engine from other
//! failures.

use crate::error::TransportError;

/// Converts a failed HTTP exchange into a [`TransportError`].
///
/// Errors whose text is empty become [`TransportError::Opaque`].
pub(super) fn exchange_error(error: &(dyn std::error::Error + 'static)) -> TransportError {
    let message = error.to_string();
    let io_kind = io_error_kind_in_chain(error);

    if message.trim().is_empty() && io_kind.is_none() {
        return TransportError::Opaque;
    }

    TransportError::Exchange { message, io_kind }
}

/// Walk the error and its source chain looking for an `io::Error` kind.
fn io_error_kind_in_chain(
    error: &(dyn std::error::Error + 'static),
) -> Option<std::io::ErrorKind> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            return Some(io_err.kind());
        }
        current = err.source();
    }
    None
}
