use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while_m_n},
    character::complete::{char, space1},
    combinator::{all_consuming, map, map_res, opt, value},
    sequence::{terminated, tuple},
    IResult,
};
use thiserror::Error;

/// Rejected `Memento-Datetime` / `Accept-Datetime` value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid RFC 1123 datetime: '{0}'")]
pub struct DatetimeError(pub String);

/// A memento instant, canonical at second precision in UTC.
///
/// All comparisons between mementos go through this type so that two headers
/// spelling the same instant differently ("Sat, 1 Jan 2000 ..." and
/// "Sat, 01 Jan 2000 ...") can never be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MementoDatetime(DateTime<Utc>);

impl MementoDatetime {
    /// Parses an RFC 1123 date, e.g. `Tue, 3 Jun 2008 11:05:30 GMT`.
    pub fn parse(input: &str) -> Result<Self, DatetimeError> {
        let input = input.trim();
        match all_consuming(rfc1123)(input) {
            Ok((_, parsed)) => parsed.resolve().ok_or_else(|| DatetimeError(input.to_string())),
            Err(_) => Err(DatetimeError(input.to_string())),
        }
    }

    /// The current instant, truncated to whole seconds.
    pub fn now() -> Self {
        Self::from_timestamp(Utc::now().timestamp()).unwrap_or(Self(DateTime::<Utc>::MIN_UTC))
    }

    pub fn from_timestamp(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0).single().map(Self)
    }

    pub fn timestamp(&self) -> i64 {
        self.0.timestamp()
    }

    /// `xsd:dateTime` lexical form, used inside RDF bodies.
    pub fn to_xsd(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl fmt::Display for MementoDatetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%a, %-d %b %Y %H:%M:%S GMT"))
    }
}

impl std::str::FromStr for MementoDatetime {
    type Err = DatetimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct Parsed {
    weekday: Option<Weekday>,
    day: u32,
    month: u32,
    year: i32,
    hour: u32,
    minute: u32,
    second: u32,
}

impl Parsed {
    fn resolve(self) -> Option<MementoDatetime> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month, self.day)?;
        if let Some(weekday) = self.weekday {
            if date.weekday() != weekday {
                return None;
            }
        }
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, self.second)?;
        Some(MementoDatetime(Utc.from_utc_datetime(&NaiveDateTime::new(date, time))))
    }
}

// --- GRAMMAR ---

fn digits(min: usize, max: usize) -> impl FnMut(&str) -> IResult<&str, u32> {
    move |input| map_res(take_while_m_n(min, max, |c: char| c.is_ascii_digit()), |s: &str| s.parse::<u32>())(input)
}

fn weekday(input: &str) -> IResult<&str, Weekday> {
    alt((
        value(Weekday::Mon, tag("Mon")),
        value(Weekday::Tue, tag("Tue")),
        value(Weekday::Wed, tag("Wed")),
        value(Weekday::Thu, tag("Thu")),
        value(Weekday::Fri, tag("Fri")),
        value(Weekday::Sat, tag("Sat")),
        value(Weekday::Sun, tag("Sun")),
    ))(input)
}

fn month(input: &str) -> IResult<&str, u32> {
    alt((
        value(1, tag("Jan")),
        value(2, tag("Feb")),
        value(3, tag("Mar")),
        value(4, tag("Apr")),
        value(5, tag("May")),
        value(6, tag("Jun")),
        value(7, tag("Jul")),
        value(8, tag("Aug")),
        value(9, tag("Sep")),
        value(10, tag("Oct")),
        value(11, tag("Nov")),
        value(12, tag("Dec")),
    ))(input)
}

fn rfc1123(input: &str) -> IResult<&str, Parsed> {
    let (input, weekday) = opt(terminated(weekday, tuple((char(','), space1))))(input)?;
    let (input, (day, _, month, _, year, _)) =
        tuple((digits(1, 2), space1, month, space1, digits(4, 4), space1))(input)?;
    let (input, (hour, _, minute)) = tuple((digits(2, 2), char(':'), digits(2, 2)))(input)?;
    let (input, second) = opt(map(tuple((char(':'), digits(2, 2))), |(_, s)| s))(input)?;
    let (input, _) = tuple((space1, tag("GMT")))(input)?;

    Ok((
        input,
        Parsed {
            weekday,
            day,
            month,
            year: year as i32,
            hour,
            minute,
            second: second.unwrap_or(0),
        },
    ))
}
