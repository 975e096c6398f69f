//! Input records submitted for a certificate.
//!
//! `RawRecord` mirrors the flat JSON the form layer posts. It is normalized
//! once into `InputRecord`, where the mobility sentinel becomes a tagged
//! variant and every field has its final type.

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Sentinel the form layer uses for "no sustainable mobility".
pub const MOBILITY_NO: &str = "no";

/// Declared form bounds. The overlay core trusts callers to respect them.
pub const MAX_NAME_LEN: usize = 128;
pub const MAX_ADDRESS_LEN: usize = 256;
pub const MAX_EMPLOYER_LEN: usize = 128;
pub const MAX_LOCATION_LEN: usize = 128;
pub const MAX_DISTANCE_KM: u32 = 1000;
pub const MAX_DAYS: u32 = 365;

/// Record as posted by the form layer.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct RawRecord {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub days: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub year: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub distance: Option<u32>,
    #[serde(default)]
    pub employer: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub ministry: Option<String>,
    #[serde(default)]
    pub home_address: Option<String>,
    #[serde(default)]
    pub work_address: Option<String>,
    /// `"no"`, or any other value meaning "yes, since `mobility_date`".
    #[serde(default)]
    pub mobility: Option<String>,
    #[serde(default)]
    pub mobility_date: Option<String>,
}

/// Form inputs send counts either as JSON numbers or as digit strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum CountInput {
    Number(u32),
    Text(String),
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<CountInput>::deserialize(deserializer)? {
        None => Ok(None),
        Some(CountInput::Number(n)) => Ok(Some(n)),
        Some(CountInput::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(CountInput::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Discriminant selecting which mobility mark is drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mobility {
    No,
    /// Uses sustainable mobility since `date`. The date is drawn as given.
    Yes { date: String },
}

impl Mobility {
    /// Normalize the form sentinel. An absent value counts as "no".
    pub fn from_form(mobility: Option<&str>, date: Option<String>) -> Self {
        match mobility {
            None => Mobility::No,
            Some(MOBILITY_NO) => Mobility::No,
            Some(_) => Mobility::Yes {
                date: date.unwrap_or_default(),
            },
        }
    }
}

/// Text fields a layout table can place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Location,
    Address,
    Days,
    Year,
    Distance,
    Employer,
    Rank,
    Ministry,
    HomeAddress,
    WorkAddress,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Location => "location",
            Field::Address => "address",
            Field::Days => "days",
            Field::Year => "year",
            Field::Distance => "distance",
            Field::Employer => "employer",
            Field::Rank => "rank",
            Field::Ministry => "ministry",
            Field::HomeAddress => "home_address",
            Field::WorkAddress => "work_address",
        }
    }

    /// Longest value the form can submit, in characters. `None` when the
    /// form leaves the field unbounded.
    pub fn max_len(&self) -> Option<usize> {
        match self {
            Field::Name => Some(MAX_NAME_LEN),
            Field::Address => Some(MAX_ADDRESS_LEN),
            Field::Employer => Some(MAX_EMPLOYER_LEN),
            Field::Location => Some(MAX_LOCATION_LEN),
            Field::Days => Some(digits(MAX_DAYS)),
            Field::Distance => Some(digits(MAX_DISTANCE_KM)),
            Field::Year => Some(digits(u32::MAX)),
            Field::Rank | Field::Ministry | Field::HomeAddress | Field::WorkAddress => None,
        }
    }
}

fn digits(n: u32) -> usize {
    n.to_string().len()
}

/// Validated record owned by a single render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    pub name: String,
    pub location: String,
    pub address: Option<String>,
    pub days: Option<u32>,
    pub year: Option<u32>,
    pub distance: Option<u32>,
    pub employer: Option<String>,
    pub rank: Option<String>,
    pub ministry: Option<String>,
    pub home_address: Option<String>,
    pub work_address: Option<String>,
    pub mobility: Mobility,
}

impl InputRecord {
    /// Minimal record with only the required fields set.
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            address: None,
            days: None,
            year: None,
            distance: None,
            employer: None,
            rank: None,
            ministry: None,
            home_address: None,
            work_address: None,
            mobility: Mobility::No,
        }
    }

    /// String form of a field, or `None` when the record leaves it out.
    /// Counts are printed as plain digits.
    pub fn value(&self, field: Field) -> Option<String> {
        match field {
            Field::Name => Some(self.name.clone()),
            Field::Location => Some(self.location.clone()),
            Field::Address => self.address.clone(),
            Field::Days => self.days.map(|n| n.to_string()),
            Field::Year => self.year.map(|n| n.to_string()),
            Field::Distance => self.distance.map(|n| n.to_string()),
            Field::Employer => self.employer.clone(),
            Field::Rank => self.rank.clone(),
            Field::Ministry => self.ministry.clone(),
            Field::HomeAddress => self.home_address.clone(),
            Field::WorkAddress => self.work_address.clone(),
        }
    }
}

impl From<RawRecord> for InputRecord {
    fn from(raw: RawRecord) -> Self {
        let mobility = Mobility::from_form(raw.mobility.as_deref(), raw.mobility_date);
        Self {
            name: raw.name,
            location: raw.location,
            address: raw.address,
            days: raw.days,
            year: raw.year,
            distance: raw.distance,
            employer: raw.employer,
            rank: raw.rank,
            ministry: raw.ministry,
            home_address: raw.home_address,
            work_address: raw.work_address,
            mobility,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_sentinel_normalizes_to_no() {
        let raw: RawRecord =
            serde_json::from_str(r#"{"name":"Jane Doe","location":"Paris","mobility":"no"}"#)
                .unwrap();
        assert_eq!(InputRecord::from(raw).mobility, Mobility::No);
    }

    #[test]
    fn any_other_value_carries_the_date() {
        let raw: RawRecord = serde_json::from_str(
            r#"{"name":"Jane Doe","location":"Paris","mobility":"yes","mobility_date":"12/04/2024"}"#,
        )
        .unwrap();
        assert_eq!(
            InputRecord::from(raw).mobility,
            Mobility::Yes {
                date: "12/04/2024".to_string()
            }
        );
    }

    #[test]
    fn yes_without_date_keeps_an_empty_date() {
        assert_eq!(
            Mobility::from_form(Some("since"), None),
            Mobility::Yes {
                date: String::new()
            }
        );
    }

    #[test]
    fn absent_mobility_counts_as_no() {
        assert_eq!(Mobility::from_form(None, Some("01/01/2024".into())), Mobility::No);
    }

    #[test]
    fn counts_accept_numbers_and_digit_strings() {
        let raw: RawRecord = serde_json::from_str(
            r#"{"name":"A","location":"B","days":5,"year":"2024","distance":""}"#,
        )
        .unwrap();
        assert_eq!(raw.days, Some(5));
        assert_eq!(raw.year, Some(2024));
        assert_eq!(raw.distance, None);
    }

    #[test]
    fn non_numeric_count_is_rejected() {
        let result: Result<RawRecord, _> =
            serde_json::from_str(r#"{"name":"A","location":"B","days":"five"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn counts_have_short_bounds() {
        assert_eq!(Field::Days.max_len(), Some(3));
        assert_eq!(Field::Distance.max_len(), Some(4));
        assert_eq!(Field::Year.max_len(), Some(10));
        assert_eq!(Field::Name.max_len(), Some(MAX_NAME_LEN));
        assert_eq!(Field::Ministry.max_len(), None);
    }

    #[test]
    fn values_are_stringified_without_grouping() {
        let mut record = InputRecord::new("Jane Doe", "Paris");
        record.distance = Some(1000);
        assert_eq!(record.value(Field::Distance).as_deref(), Some("1000"));
        assert_eq!(record.value(Field::Rank), None);
        assert_eq!(record.value(Field::Name).as_deref(), Some("Jane Doe"));
    }
}
