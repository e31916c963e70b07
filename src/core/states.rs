//! Census of Governments state codes.
//!
//! District identifiers in the annual school finance files start with a two digit
//! state code. Codes run alphabetically by state name and include the District of
//! Columbia, so they differ from FIPS codes (California is 05 here, 06 in FIPS).

/// Index 0 holds code 01.
pub const STATE_NAMES: [&str; 51] = [
    "Alabama",
    "Alaska",
    "Arizona",
    "Arkansas",
    "California",
    "Colorado",
    "Connecticut",
    "Delaware",
    "District of Columbia",
    "Florida",
    "Georgia",
    "Hawaii",
    "Idaho",
    "Illinois",
    "Indiana",
    "Iowa",
    "Kansas",
    "Kentucky",
    "Louisiana",
    "Maine",
    "Maryland",
    "Massachusetts",
    "Michigan",
    "Minnesota",
    "Mississippi",
    "Missouri",
    "Montana",
    "Nebraska",
    "Nevada",
    "New Hampshire",
    "New Jersey",
    "New Mexico",
    "New York",
    "North Carolina",
    "North Dakota",
    "Ohio",
    "Oklahoma",
    "Oregon",
    "Pennsylvania",
    "Rhode Island",
    "South Carolina",
    "South Dakota",
    "Tennessee",
    "Texas",
    "Utah",
    "Vermont",
    "Virginia",
    "Washington",
    "West Virginia",
    "Wisconsin",
    "Wyoming",
];

pub fn state_name(code: u8) -> Option<&'static str> {
    match code {
        1..=51 => Some(STATE_NAMES[usize::from(code) - 1]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_alphabetical_with_dc() {
        assert_eq!(state_name(1), Some("Alabama"));
        assert_eq!(state_name(5), Some("California"));
        assert_eq!(state_name(9), Some("District of Columbia"));
        assert_eq!(state_name(10), Some("Florida"));
        assert_eq!(state_name(51), Some("Wyoming"));

        let mut sorted = STATE_NAMES.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STATE_NAMES.to_vec());
    }

    #[test]
    fn test_out_of_range_codes() {
        assert_eq!(state_name(0), None);
        assert_eq!(state_name(52), None);
    }
}
