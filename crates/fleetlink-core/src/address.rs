//! Vehicle address escaping for request path segments.
//!
//! Serial links such as `/dev/ttyUSB0` carry path separators, so every
//! address is rewritten `/` -> `+` before it is embedded in a URL and
//! rewritten back on the receiving side.

use crate::error::AddressError;

const PATH_SEPARATOR: char = '/';
const ESCAPE: char = '+';

/// Escape a vehicle address for use as one path segment.
pub fn escape_address(address: &str) -> Result<String, AddressError> {
    if address.trim().is_empty() {
        return Err(AddressError::Empty);
    }
    if address.contains(ESCAPE) {
        return Err(AddressError::ReservedCharacter(address.to_string()));
    }
    Ok(address.replace(PATH_SEPARATOR, "+"))
}

/// Reverse [`escape_address`].
pub fn unescape_address(segment: &str) -> String {
    segment.replace(ESCAPE, "/")
}
