use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn to_primitive_utc(value: OffsetDateTime) -> PrimitiveDateTime {
    let utc = value.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Whole minutes elapsed between two instants, clamped at zero.
pub(crate) fn minutes_between(start: PrimitiveDateTime, end: PrimitiveDateTime) -> i32 {
    let elapsed = end.assume_utc() - start.assume_utc();
    elapsed.whole_minutes().max(0) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Time};

    fn at(hour: u8, minute: u8) -> PrimitiveDateTime {
        let date = Date::from_calendar_date(2026, time::Month::February, 11).unwrap();
        PrimitiveDateTime::new(date, Time::from_hms(hour, minute, 0).unwrap())
    }

    #[test]
    fn format_primitive_outputs_utc_z() {
        assert_eq!(format_primitive(at(9, 45)), "2026-02-11T09:45:00Z");
    }

    #[test]
    fn minutes_between_clamps_negative() {
        assert_eq!(minutes_between(at(10, 0), at(11, 30)), 90);
        assert_eq!(minutes_between(at(11, 30), at(10, 0)), 0);
    }
}
