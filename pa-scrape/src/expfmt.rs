use std::collections::HashMap;

use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{
    is_not,
    tag,
    take_while,
    take_while1,
};
use nom::character::complete::{
    char,
    digit1,
};
use nom::combinator::{
    map,
    map_res,
    opt,
    recognize,
    value,
};
use nom::multi::{
    fold_many0,
    separated_list0,
};
use nom::sequence::{
    delimited,
    pair,
    preceded,
};
use nom::number::complete::double;
use thiserror::Error;
use tracing::*;

use crate::sample::{
    Label,
    Labels,
    MetricMeta,
    MetricSample,
    MetricType,
};

#[derive(Debug, Error, PartialEq)]
pub enum ExpositionError {
    #[error("malformed sample line: `{0}`")]
    BadSample(String),

    #[error("malformed {0} line: `{1}`")]
    BadHeader(&'static str, String),
}

// One line of Prometheus text exposition format.  Comments that are neither
// HELP nor TYPE parse to nothing.
#[derive(Debug, PartialEq)]
pub enum Line {
    Help { metric: String, text: String },
    Type { metric: String, kind: MetricType },
    Sample(RawSample),
}

// A sample as it appears on the wire; the timestamp is optional there and
// only defaulted to the collection time once the whole body is assembled.
#[derive(Debug, PartialEq)]
pub struct RawSample {
    pub name: String,
    pub labels: Labels,
    pub value: f64,
    pub timestamp_ms: Option<i64>,
}

impl Line {
    pub fn parse(input: &str) -> Result<Option<Line>, ExpositionError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }

        if let Some(rest) = input.strip_prefix('#') {
            let rest = rest.trim_start();
            if rest.starts_with("HELP") {
                return match help_line(input) {
                    Ok((_, line)) => Ok(Some(line)),
                    Err(_) => Err(ExpositionError::BadHeader("HELP", input.into())),
                };
            }
            if rest.starts_with("TYPE") {
                return match type_line(input) {
                    Ok((remaining, line)) if remaining.trim().is_empty() => Ok(Some(line)),
                    _ => Err(ExpositionError::BadHeader("TYPE", input.into())),
                };
            }
            // any other comment is skipped
            return Ok(None);
        }

        match sample_line(input) {
            Ok((remaining, sample)) if remaining.is_empty() => Ok(Some(Line::Sample(sample))),
            _ => Err(ExpositionError::BadSample(input.into())),
        }
    }
}

pub struct ParsedBody {
    pub samples: Vec<MetricSample>,
    pub metadata: HashMap<String, MetricMeta>,
}

// Parses a whole scrape body.  A malformed line only loses itself: the rest
// of the batch goes through.
pub fn parse_body(body: &str, default_timestamp_ms: i64) -> ParsedBody {
    let mut samples = vec![];
    let mut metadata: HashMap<String, MetricMeta> = HashMap::new();
    let mut skipped = 0usize;

    for line in body.lines() {
        match Line::parse(line) {
            Ok(None) => {},
            Ok(Some(Line::Help { metric, text })) => metadata.entry(metric).or_default().help = Some(text),
            Ok(Some(Line::Type { metric, kind })) => metadata.entry(metric).or_default().kind = Some(kind),
            Ok(Some(Line::Sample(raw))) => samples.push(MetricSample {
                metric: raw.name,
                labels: raw.labels,
                value: raw.value,
                timestamp_ms: raw.timestamp_ms.unwrap_or(default_timestamp_ms),
            }),
            Err(err) => {
                skipped += 1;
                debug!("{err}");
            },
        }
    }

    if skipped > 0 {
        debug!("skipped {skipped} malformed line(s) in scrape body");
    }
    ParsedBody { samples, metadata }
}

fn sp(input: &str) -> IResult<&str, &str> {
    take_while(|c| c == ' ' || c == '\t')(input)
}

fn sp1(input: &str) -> IResult<&str, &str> {
    take_while1(|c| c == ' ' || c == '\t')(input)
}

/// Metric names match `[a-zA-Z_][a-zA-Z0-9_:]*`.
fn metric_name(input: &str) -> IResult<&str, String> {
    map(
        pair(
            take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == ':'),
        ),
        |(a, b): (&str, &str)| format!("{a}{b}"),
    )(input)
}

/// Label names match `[a-zA-Z_][a-zA-Z0-9_]*` (no colons).
fn label_name(input: &str) -> IResult<&str, String> {
    map(
        pair(
            take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        ),
        |(a, b): (&str, &str)| format!("{a}{b}"),
    )(input)
}

// Label values are double-quoted with `\\`, `\"`, and `\n` escapes
fn escaped_string(input: &str) -> IResult<&str, String> {
    enum Fragment<'a> {
        Literal(&'a str),
        Escaped(char),
    }

    let fragment = alt((
        map(is_not("\"\\"), Fragment::Literal),
        map(
            preceded(
                char('\\'),
                alt((value('\n', char('n')), value('"', char('"')), value('\\', char('\\')))),
            ),
            Fragment::Escaped,
        ),
    ));

    let body = fold_many0(fragment, String::new, |mut acc, frag| {
        match frag {
            Fragment::Literal(s) => acc.push_str(s),
            Fragment::Escaped(c) => acc.push(c),
        }
        acc
    });

    delimited(char('"'), body, char('"'))(input)
}

fn label(input: &str) -> IResult<&str, Label> {
    let (input, _) = sp(input)?;
    let (input, name) = label_name(input)?;
    let (input, _) = sp(input)?;
    let (input, _) = char('=')(input)?;
    let (input, _) = sp(input)?;
    let (input, value) = escaped_string(input)?;
    Ok((input, Label { name, value }))
}

// `{name="value",...}`; the block is optional and a trailing comma is legal
fn label_block(input: &str) -> IResult<&str, Labels> {
    let (input, _) = sp(input)?;
    let (input, open) = opt(char('{'))(input)?;
    if open.is_none() {
        return Ok((input, Labels::new()));
    }

    let (input, parsed) = separated_list0(preceded(sp, char(',')), label)(input)?;
    let (input, _) = opt(preceded(sp, char(',')))(input)?;
    let (input, _) = sp(input)?;
    let (input, _) = char('}')(input)?;

    let mut labels = Labels::new();
    for l in parsed {
        labels.push(l);
    }
    Ok((input, labels))
}

fn sample_value(input: &str) -> IResult<&str, f64> {
    preceded(
        sp,
        alt((
            value(f64::INFINITY, tag("+Inf")),
            value(f64::NEG_INFINITY, tag("-Inf")),
            value(f64::NAN, tag("NaN")),
            double,
        )),
    )(input)
}

fn timestamp_ms(input: &str) -> IResult<&str, Option<i64>> {
    preceded(
        sp,
        opt(map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| s.parse::<i64>())),
    )(input)
}

fn sample_line(input: &str) -> IResult<&str, RawSample> {
    let (input, name) = metric_name(input)?;
    let (input, labels) = label_block(input)?;
    let (input, value) = sample_value(input)?;
    let (input, timestamp_ms) = timestamp_ms(input)?;
    let (input, _) = sp(input)?;
    Ok((input, RawSample { name, labels, value, timestamp_ms }))
}

/// `# HELP <metric> <text>`; the text runs to end of line and may use the
/// `\\` and `\n` escapes.
fn help_line(input: &str) -> IResult<&str, Line> {
    let (input, _) = char('#')(input)?;
    let (input, _) = sp(input)?;
    let (input, _) = tag("HELP")(input)?;
    let (input, _) = sp1(input)?;
    let (input, metric) = metric_name(input)?;
    let (input, _) = sp(input)?;

    let text = unescape_help(input.trim_end());
    Ok(("", Line::Help { metric, text }))
}

/// `# TYPE <metric> <type>`
fn type_line(input: &str) -> IResult<&str, Line> {
    let (input, _) = char('#')(input)?;
    let (input, _) = sp(input)?;
    let (input, _) = tag("TYPE")(input)?;
    let (input, _) = sp1(input)?;
    let (input, metric) = metric_name(input)?;
    let (input, _) = sp1(input)?;
    let (input, kind) = alt((
        value(MetricType::Counter, tag("counter")),
        value(MetricType::Gauge, tag("gauge")),
        value(MetricType::Histogram, tag("histogram")),
        value(MetricType::Summary, tag("summary")),
        value(MetricType::Untyped, tag("untyped")),
    ))(input)?;
    Ok((input, Line::Type { metric, kind }))
}

fn unescape_help(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            },
            None => out.push('\\'),
        }
    }
    out
}
