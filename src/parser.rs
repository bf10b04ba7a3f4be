use crate::error::{Result, SerenataError};
use crate::srt::Subtitle;

use std::time::Duration;

use nom::bytes::complete::{tag, take_while_m_n};
use nom::character::complete::{char, digit1, one_of, space0, space1};
use nom::combinator::{all_consuming, map_opt, map_res, opt, verify};
use nom::error::{convert_error, VerboseError};
use nom::sequence::{delimited, preceded, separated_pair, terminated, tuple};
use nom::{Err, IResult};

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Lines of one block, between blank lines.
struct Block<'a> {
    /// 1-based line number of the counter line.
    line: usize,
    counter: &'a str,
    rest: Vec<&'a str>,
}

/// Parses a complete SRT document. Subtitles are returned ordered by
/// their show time; blocks sharing a show time keep their file order.
pub fn parse_srt(input: &str) -> Result<Vec<Subtitle>> {
    let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
    let mut subs = split_blocks(input)
        .iter()
        .map(parse_block)
        .collect::<Result<Vec<_>>>()?;
    subs.sort_by_key(|s| s.show_at);
    Ok(subs)
}

fn split_blocks(input: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut current: Option<Block> = None;
    for (index, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            blocks.extend(current.take());
            continue;
        }
        match &mut current {
            Some(block) => block.rest.push(line),
            None => {
                current = Some(Block {
                    line: index + 1,
                    counter: line,
                    rest: Vec::new(),
                })
            }
        }
    }
    blocks.extend(current);
    blocks
}

fn parse_block(block: &Block) -> Result<Subtitle> {
    let sequence_number = parse_line(block.counter, block.line, "a counter", counter)?;
    let Some((&timing_line, text)) = block.rest.split_first() else {
        return Err(SerenataError::Parse(format!(
            "line {}: block {} has no timing line",
            block.line, sequence_number
        )));
    };
    let (show_at, hide_at) = parse_line(timing_line, block.line + 1, "a timing line", timing)?;
    if hide_at < show_at {
        return Err(SerenataError::Parse(format!(
            "line {}: block {} ends before it starts",
            block.line + 1,
            sequence_number
        )));
    }

    Ok(Subtitle {
        sequence_number: Some(sequence_number),
        show_at,
        hide_at,
        text: text.iter().map(|line| line.to_string()).collect(),
    })
}

fn parse_line<'a, T>(
    line: &'a str,
    number: usize,
    expected: &str,
    parser: impl FnMut(&'a str) -> Res<'a, T>,
) -> Result<T> {
    match all_consuming(parser)(line) {
        Ok((_, value)) => Ok(value),
        Err(Err::Error(err)) | Err(Err::Failure(err)) => Err(SerenataError::Parse(format!(
            "line {}: expected {}\n{}",
            number,
            expected,
            convert_error(line, err)
        ))),
        Err(Err::Incomplete(_)) => {
            unreachable!("Incomplete data received by non-streaming parser.")
        }
    }
}

fn counter(input: &str) -> Res<'_, usize> {
    delimited(space0, map_res(digit1, |s: &str| s.parse::<usize>()), space0)(input)
}

fn timing(input: &str) -> Res<'_, (Duration, Duration)> {
    terminated(
        separated_pair(clock, tuple((space1, tag("-->"), space1)), clock),
        space0,
    )(input)
}

/// `H:MM:SS,mmm`. Hours may have any number of digits, minutes and
/// seconds one or two, and the fraction (after `,` or `.`) up to three.
fn clock(input: &str) -> Res<'_, Duration> {
    let hours = map_res(digit1, |s: &str| s.parse::<u64>());
    let sixty = || verify(two_digits, |n: &u64| *n < 60);
    map_opt(
        tuple((
            hours,
            preceded(char(':'), sixty()),
            preceded(char(':'), sixty()),
            opt(preceded(one_of(",."), millis)),
        )),
        |(hours, minutes, seconds, millis)| {
            let secs = hours.checked_mul(3600)?.checked_add(minutes * 60 + seconds)?;
            Some(Duration::from_secs(secs) + Duration::from_millis(millis.unwrap_or(0)))
        },
    )(input)
}

fn two_digits(input: &str) -> Res<'_, u64> {
    map_res(take_while_m_n(1, 2, |c: char| c.is_ascii_digit()), |s: &str| {
        s.parse::<u64>()
    })(input)
}

fn millis(input: &str) -> Res<'_, u64> {
    // Hand-written lyric files often carry `,5` for half a second, so the
    // fraction is right-padded: `,5` reads as `,500`.
    map_res(take_while_m_n(0, 3, |c: char| c.is_ascii_digit()), |s: &str| {
        format!("{:0<3}", s).parse::<u64>()
    })(input)
}
