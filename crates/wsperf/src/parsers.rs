use std::time::Duration;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, tag_no_case},
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, map_opt, map_res, opt, recognize, value},
    multi::{many1, separated_list1},
    sequence::{pair, preceded},
};

use crate::errors::ConfigError;

// Durations accepted for `message-interval`:
//
//    simple   =  1*digit [ unit ]          ; no unit means seconds
//    unit     =  "ms" / "s" / "m" / "h" / "d"
//    iso      =  "PT" 1*( decimal ( "H" / "M" / "S" ) )
//    decimal  =  1*digit [ "." 1*digit ]

#[derive(Debug, Clone, Copy, PartialEq)]
enum Unit {
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl Unit {
    fn to_duration(self, amount: u64) -> Option<Duration> {
        let millis = match self {
            Unit::Millis => amount,
            Unit::Seconds => amount.checked_mul(1_000)?,
            Unit::Minutes => amount.checked_mul(60_000)?,
            Unit::Hours => amount.checked_mul(3_600_000)?,
            Unit::Days => amount.checked_mul(86_400_000)?,
        };
        Some(Duration::from_millis(millis))
    }
}

fn unit_parser(input: &str) -> IResult<&str, Unit> {
    // "ms" must be tried before "m"
    alt((
        value(Unit::Millis, tag("ms")),
        value(Unit::Seconds, tag("s")),
        value(Unit::Minutes, tag("m")),
        value(Unit::Hours, tag("h")),
        value(Unit::Days, tag("d")),
    ))
    .parse(input)
}

pub fn simple_duration_parser(input: &str) -> IResult<&str, Duration> {
    map_opt(
        pair(map_res(digit1, str::parse::<u64>), opt(unit_parser)),
        |(amount, unit)| unit.unwrap_or(Unit::Seconds).to_duration(amount),
    )
    .parse(input)
}

fn decimal_parser(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        str::parse::<f64>,
    )
    .parse(input)
}

fn iso_component_parser(input: &str) -> IResult<&str, f64> {
    map_opt(pair(decimal_parser, one_of("HMShms")), |(amount, unit)| {
        match unit.to_ascii_uppercase() {
            'H' => Some(amount * 3_600.0),
            'M' => Some(amount * 60.0),
            'S' => Some(amount),
            _ => None,
        }
    })
    .parse(input)
}

pub fn iso_duration_parser(input: &str) -> IResult<&str, Duration> {
    map_opt(
        preceded(tag_no_case("PT"), many1(iso_component_parser)),
        |seconds: Vec<f64>| Duration::try_from_secs_f64(seconds.iter().sum()).ok(),
    )
    .parse(input)
}

/// Parses a `message-interval` value such as `500ms`, `2s`, `10` or `PT0.5S`.
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let trimmed = input.trim();
    all_consuming(alt((iso_duration_parser, simple_duration_parser)))
        .parse(trimmed)
        .map(|(_, duration)| duration)
        .map_err(|_| ConfigError::InvalidDuration(input.to_owned()))
}

/// Leading numeric components of a dotted version tag.
/// `"3.15.1.Final"` gives `[3, 15, 1]` and leaves `".Final"`.
pub fn version_parser(input: &str) -> IResult<&str, Vec<u64>> {
    separated_list1(char('.'), map_res(digit1, str::parse::<u64>)).parse(input)
}
