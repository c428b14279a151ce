//! Selection text parser.
//!
//! Turns the free-form selection text captured at placement into a
//! typed `Selection`. Any failure here blocks wager creation.
//!
//! Policies:
//! - The backed team is found by case-insensitive substring match of
//!   each stored team name in the text. Matching neither or both fails.
//! - Spread lines keep an explicit `+`/`-`. An unsigned value is read as
//!   a favorite line (negative). `0`, `pk`, `pick`, `pick'em` and `even`
//!   are pick'em and stay zero.
//! - Totals and props need the whole word `over` or `under`.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::event::{Event, EventId};
use super::payout::AmericanOdds;
use super::selection::{Direction, Leg, LegSelection, Selection, Side};
use super::wager::WagerKind;

const PICKEM_WORDS: &[&str] = &["pk", "pick", "pick'em", "pickem", "even"];

/// Validation failures raised while parsing a selection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("selection {text:?} names neither team")]
    NoTeamMatch { text: String },
    #[error("selection {text:?} matches both teams")]
    AmbiguousTeam { text: String },
    #[error("selection has no over/under keyword")]
    MissingDirection,
    #[error("selection has both over and under")]
    AmbiguousDirection,
    #[error("selection has no numeric line")]
    MissingLine,
    #[error("selection has more than one numeric line")]
    AmbiguousLine,
    #[error("invalid line {token:?}")]
    InvalidLine { token: String },
    #[error("player prop has no player id")]
    MissingPlayer,
    #[error("player prop has no market")]
    MissingMarket,
    #[error("combination wagers must be parsed leg by leg")]
    CombinationRequiresLegs,
    #[error("combination has no legs")]
    EmptyCombination,
    #[error("leg {index} is itself a combination")]
    NestedCombination { index: usize },
    #[error("leg {index} references unknown event {event_id}")]
    UnknownLegEvent { index: usize, event_id: EventId },
    #[error("invalid price {price}")]
    InvalidPrice { price: i32 },
}

/// One combination leg as submitted by the placement surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegInput {
    pub event_id: EventId,
    pub kind: WagerKind,
    pub text: String,
    /// American odds quoted for this leg.
    pub price: i32,
}

/// Parse a single-market selection.
pub fn parse(
    text: &str,
    kind: WagerKind,
    home_team: &str,
    away_team: &str,
) -> Result<Selection, ParseError> {
    parse_leg(text, kind, home_team, away_team).map(Selection::Single)
}

/// Parse every leg of a combination against its own event.
pub fn parse_combination(
    legs: &[LegInput],
    events: &HashMap<EventId, Event>,
) -> Result<Selection, ParseError> {
    if legs.is_empty() {
        return Err(ParseError::EmptyCombination);
    }

    let mut parsed = Vec::with_capacity(legs.len());
    for (index, input) in legs.iter().enumerate() {
        if input.kind == WagerKind::Combination {
            return Err(ParseError::NestedCombination { index });
        }
        let event = events
            .get(&input.event_id)
            .ok_or_else(|| ParseError::UnknownLegEvent {
                index,
                event_id: input.event_id.clone(),
            })?;
        let price = AmericanOdds::new(input.price)
            .ok_or(ParseError::InvalidPrice { price: input.price })?;
        let selection = parse_leg(&input.text, input.kind, &event.home_team, &event.away_team)?;
        parsed.push(Leg {
            event_id: input.event_id.clone(),
            price,
            selection,
        });
    }
    Ok(Selection::Combination(parsed))
}

fn parse_leg(
    text: &str,
    kind: WagerKind,
    home_team: &str,
    away_team: &str,
) -> Result<LegSelection, ParseError> {
    match kind {
        WagerKind::Moneyline => {
            let (side, _) = match_team(text, home_team, away_team)?;
            Ok(LegSelection::Moneyline { side })
        }
        WagerKind::PointSpread => {
            let (side, rest) = match_team(text, home_team, away_team)?;
            let spread = single_line(&rest)?.spread();
            Ok(LegSelection::PointSpread { side, spread })
        }
        WagerKind::Total => {
            let rest = strip_names(&text.to_lowercase(), &[home_team, away_team]);
            let direction = direction(&rest)?;
            let line = single_line(&rest)?.unsigned()?;
            Ok(LegSelection::Total { direction, line })
        }
        WagerKind::PlayerProp => parse_player_prop(text),
        WagerKind::Combination => Err(ParseError::CombinationRequiresLegs),
    }
}

/// `<player id> <market…> <over|under> <line>`
fn parse_player_prop(text: &str) -> Result<LegSelection, ParseError> {
    let words: Vec<&str> = words(text).collect();
    let lowered = text.to_lowercase();
    let direction = direction(&lowered)?;

    let keyword = words
        .iter()
        .position(|w| w.eq_ignore_ascii_case("over") || w.eq_ignore_ascii_case("under"))
        .ok_or(ParseError::MissingDirection)?;
    if keyword == 0 {
        return Err(ParseError::MissingPlayer);
    }
    let market = words[1..keyword].join(" ");
    if market.is_empty() {
        return Err(ParseError::MissingMarket);
    }
    let line = single_line(&words[keyword + 1..].join(" "))?.unsigned()?;

    Ok(LegSelection::PlayerProp {
        player_id: words[0].to_string(),
        market,
        line,
        direction,
    })
}

/// Resolve the backed side. Returns the lowercased text with the
/// matched team name removed, so digits in names never read as lines.
fn match_team(text: &str, home_team: &str, away_team: &str) -> Result<(Side, String), ParseError> {
    let lowered = text.to_lowercase();
    let home = lowered.contains(&home_team.trim().to_lowercase());
    let away = lowered.contains(&away_team.trim().to_lowercase());

    match (home, away) {
        (true, false) => Ok((Side::Home, strip_names(&lowered, &[home_team]))),
        (false, true) => Ok((Side::Away, strip_names(&lowered, &[away_team]))),
        (true, true) => Err(ParseError::AmbiguousTeam {
            text: text.to_string(),
        }),
        (false, false) => Err(ParseError::NoTeamMatch {
            text: text.to_string(),
        }),
    }
}

fn strip_names(lowered: &str, names: &[&str]) -> String {
    names.iter().fold(lowered.to_string(), |acc, name| {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            acc
        } else {
            acc.replace(&name, " ")
        }
    })
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '(' | ')' | '[' | ']')))
        .filter(|w| !w.is_empty())
}

fn direction(lowered: &str) -> Result<Direction, ParseError> {
    let over = words(lowered).any(|w| w == "over");
    let under = words(lowered).any(|w| w == "under");
    match (over, under) {
        (true, false) => Ok(Direction::Over),
        (false, true) => Ok(Direction::Under),
        (true, true) => Err(ParseError::AmbiguousDirection),
        (false, false) => Err(ParseError::MissingDirection),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sign {
    Plus,
    Minus,
}

/// A numeric line as written: magnitude plus the sign, if one was given.
#[derive(Debug, Clone)]
struct Line {
    token: String,
    magnitude: Decimal,
    sign: Option<Sign>,
}

impl Line {
    /// Signed spread. Unsigned non-zero values are favorite lines.
    fn spread(&self) -> Decimal {
        if self.magnitude.is_zero() {
            return Decimal::ZERO;
        }
        match self.sign {
            Some(Sign::Plus) => self.magnitude,
            Some(Sign::Minus) | None => -self.magnitude,
        }
    }

    /// Totals and prop lines cannot be negative.
    fn unsigned(&self) -> Result<Decimal, ParseError> {
        match self.sign {
            Some(Sign::Minus) if !self.magnitude.is_zero() => Err(ParseError::InvalidLine {
                token: self.token.clone(),
            }),
            _ => Ok(self.magnitude),
        }
    }
}

/// Exactly one numeric (or pick'em) token must be present.
fn single_line(text: &str) -> Result<Line, ParseError> {
    let mut found: Option<Line> = None;
    for word in words(text) {
        let Some(line) = numeric(word)? else {
            continue;
        };
        if found.is_some() {
            return Err(ParseError::AmbiguousLine);
        }
        found = Some(line);
    }
    found.ok_or(ParseError::MissingLine)
}

/// `Ok(None)` for words that are not numbers at all; `Err` for words
/// that look numeric but do not parse.
fn numeric(word: &str) -> Result<Option<Line>, ParseError> {
    if PICKEM_WORDS.iter().any(|p| word.eq_ignore_ascii_case(p)) {
        return Ok(Some(Line {
            token: word.to_string(),
            magnitude: Decimal::ZERO,
            sign: None,
        }));
    }

    let (sign, body) = match word.as_bytes().first() {
        Some(b'+') => (Some(Sign::Plus), &word[1..]),
        Some(b'-') => (Some(Sign::Minus), &word[1..]),
        _ => (None, word),
    };
    let looks_numeric = !body.is_empty()
        && body.chars().any(|c| c.is_ascii_digit())
        && body.chars().all(|c| c.is_ascii_digit() || c == '.');
    if !looks_numeric {
        return Ok(None);
    }

    let invalid = || ParseError::InvalidLine {
        token: word.to_string(),
    };
    let magnitude = Decimal::from_str(body).map_err(|_| invalid())?;
    Ok(Some(Line {
        token: word.to_string(),
        magnitude,
        sign,
    }))
}
