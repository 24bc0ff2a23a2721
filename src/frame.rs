use crate::error::{Result, TreadmillError};

/// First byte of every frame on the wire (`[`)
pub const START_OF_MESSAGE: u8 = 0x5B;

/// Last byte of every frame on the wire (`]`)
pub const END_OF_MESSAGE: u8 = 0x5D;

/// Wrap a message payload in the wire envelope
///
/// Produces `0x5B | len | payload | 0x5D`. The length field is a single
/// byte, so payloads longer than 255 bytes cannot be framed.
///
/// # Errors
///
/// Returns [`TreadmillError::Framing`] if the payload exceeds 255 bytes.
pub fn wrap(payload: &[u8]) -> Result<Vec<u8>> {
    let len = u8::try_from(payload.len()).map_err(|_| {
        TreadmillError::Framing(format!(
            "payload too long for a single frame: {} bytes",
            payload.len()
        ))
    })?;

    let mut frame = Vec::with_capacity(payload.len() + 3);
    frame.push(START_OF_MESSAGE);
    frame.push(len);
    frame.extend_from_slice(payload);
    frame.push(END_OF_MESSAGE);

    Ok(frame)
}

/// Strip the wire envelope from a received frame and return the payload
///
/// # Errors
///
/// Returns [`TreadmillError::Framing`] (with a hex dump of the offending
/// buffer) if the frame is shorter than four bytes, does not start with
/// `0x5B`, does not end with `0x5D`, or the declared length does not match
/// the actual payload length.
pub fn unwrap(data: &[u8]) -> Result<&[u8]> {
    if data.len() <= 3 {
        return Err(TreadmillError::Framing(format!(
            "expected >3 bytes, got {}: {}",
            data.len(),
            to_hex(data)
        )));
    }

    if data[0] != START_OF_MESSAGE {
        return Err(TreadmillError::Framing(format!(
            "expected frame to start with {:#04x}, got {:#04x}: {}",
            START_OF_MESSAGE,
            data[0],
            to_hex(data)
        )));
    }

    if data[data.len() - 1] != END_OF_MESSAGE {
        return Err(TreadmillError::Framing(format!(
            "expected frame to end with {:#04x}, got {:#04x}: {}",
            END_OF_MESSAGE,
            data[data.len() - 1],
            to_hex(data)
        )));
    }

    let declared = usize::from(data[1]);
    let actual = data.len() - 3;
    if declared != actual {
        return Err(TreadmillError::Framing(format!(
            "expected length was {declared}, got {actual}: {}",
            to_hex(data)
        )));
    }

    Ok(&data[2..data.len() - 1])
}

/// Lowercase hex rendering of a byte slice, used in wire logs and errors
#[must_use]
pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_unwrap_round_trip() {
        let payload = [0x03, 0x01];
        let frame = wrap(&payload).unwrap();

        assert_eq!(frame, vec![0x5B, 0x02, 0x03, 0x01, 0x5D]);
        assert_eq!(unwrap(&frame).unwrap(), &payload);
    }

    #[test]
    fn test_wrap_rejects_oversized_payload() {
        let payload = vec![0u8; 256];
        assert!(matches!(
            wrap(&payload),
            Err(TreadmillError::Framing(_))
        ));
    }

    #[test]
    fn test_unwrap_rejects_short_frame() {
        assert!(matches!(
            unwrap(&[0x5B, 0x00, 0x5D]),
            Err(TreadmillError::Framing(_))
        ));
    }

    #[test]
    fn test_unwrap_rejects_bad_start() {
        assert!(matches!(
            unwrap(&[0x5C, 0x02, 0x03, 0x01, 0x5D]),
            Err(TreadmillError::Framing(_))
        ));
    }

    #[test]
    fn test_unwrap_rejects_bad_end() {
        assert!(matches!(
            unwrap(&[0x5B, 0x02, 0x03, 0x01, 0x5C]),
            Err(TreadmillError::Framing(_))
        ));
    }

    #[test]
    fn test_unwrap_rejects_length_mismatch() {
        assert!(matches!(
            unwrap(&[0x5B, 0x03, 0x03, 0x01, 0x5D]),
            Err(TreadmillError::Framing(_))
        ));
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[0x5B, 0x01, 0xF0, 0x5D]), "5b01f05d");
        assert_eq!(to_hex(&[]), "");
    }
}
