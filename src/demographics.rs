//! Subject age from the EDF+ patient identification field.
//!
//! Sleep-EDF stores e.g. `"X F X Female_33yr"`: the fourth subfield is the
//! patient "name", whose last `_`-separated part carries the age.

/// Parse the age out of an EDF+ patient field. `None` when absent or malformed.
///
/// ```
/// use sleepbands::demographics::parse_age;
/// assert_eq!(parse_age("X F X Female_33yr"), Some(33));
/// assert_eq!(parse_age("X X X X"), None);
/// ```
pub fn parse_age(patient_field: &str) -> Option<u32> {
    let name = patient_field.split_whitespace().nth(3)?;
    let last = name.rsplit('_').next()?;
    let digits = last.strip_suffix("yr").or_else(|| last.strip_suffix("yrs"))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_edf_patient_fields() {
        assert_eq!(parse_age("X M X Male_58yr"), Some(58));
        assert_eq!(parse_age("X F X Female_101yr"), Some(101));
        assert_eq!(parse_age("SC4001 F 01-JAN-1900 Some_Name_Female_33yr"), Some(33));
    }

    #[test]
    fn missing_or_malformed_age() {
        assert_eq!(parse_age(""), None);
        assert_eq!(parse_age("X F X"), None);
        assert_eq!(parse_age("X F X Female"), None);
        assert_eq!(parse_age("X F X Female_yr"), None);
        assert_eq!(parse_age("X F X Female_3x3yr"), None);
    }
}
