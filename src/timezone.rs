use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::Error;

/// The current UTC offset of `canonical_timezone`, e.g. "America/Sao_Paulo".
///
/// # Errors
/// Returns [Error::InvalidTimezone] if the name is not a known canonical timezone.
pub fn get_local_offset(canonical_timezone: &str) -> Result<UtcOffset, Error> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
        .ok_or_else(|| Error::InvalidTimezone(canonical_timezone.to_owned()))
}

/// The current time in `canonical_timezone`.
pub fn local_now(canonical_timezone: &str) -> Result<OffsetDateTime, Error> {
    get_local_offset(canonical_timezone).map(|offset| OffsetDateTime::now_utc().to_offset(offset))
}

#[cfg(test)]
mod tests {
    use time::UtcOffset;

    use crate::Error;

    use super::{get_local_offset, local_now};

    #[test]
    fn known_zone_has_offset() {
        assert_eq!(get_local_offset("UTC"), Ok(UtcOffset::UTC));
        assert_eq!(
            get_local_offset("America/Sao_Paulo"),
            Ok(UtcOffset::from_hms(-3, 0, 0).unwrap())
        );
    }

    #[test]
    fn unknown_zone_is_an_error() {
        assert_eq!(
            get_local_offset("Mars/Olympus_Mons"),
            Err(Error::InvalidTimezone("Mars/Olympus_Mons".to_owned()))
        );
        assert!(local_now("Mars/Olympus_Mons").is_err());
    }
}
