//! Flat, uniformly-shaped match records.
//!
//! A [`MatchRecord`] is one row of the dataset. Every record carries every
//! column listed in [`MatchRecord::COLUMNS`]; fields the source did not
//! report are `None` and render as empty cells, so exported tables never
//! misalign. Exactly two [`TeamSide`]s exist per record, enforced by the
//! type itself.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Number of columns in the record schema.
pub const COLUMN_COUNT: usize = 23;

/// On-disk format of `match_date`.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors raised when a tabular row cannot be read back into a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    /// The table has no column with this name.
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// A cell could not be parsed into the column's type.
    #[error("invalid value {value:?} in column {column}: {reason}")]
    InvalidValue {
        /// Column holding the bad cell.
        column: String,
        /// The raw cell contents.
        value: String,
        /// What was expected instead.
        reason: String,
    },
}

/// Which side of the fixture the source lists a team on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeAway {
    /// The home side.
    Home,
    /// The away side.
    Away,
}

impl HomeAway {
    /// Lowercase label used on disk and by the source.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Away => "away",
        }
    }

    /// Parse a `home`/`away` tag, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        let tag = raw.trim();
        if tag.eq_ignore_ascii_case("home") {
            Some(Self::Home)
        } else if tag.eq_ignore_ascii_case("away") {
            Some(Self::Away)
        } else {
            None
        }
    }
}

impl fmt::Display for HomeAway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scalar cell of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// The source did not report a value.
    Null,
    /// Free text.
    Text(String),
    /// Whole number (scores, season year).
    Integer(i64),
    /// Flag (neutral site, indoor, winner).
    Bool(bool),
}

impl FieldValue {
    /// Whether this cell is null.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Null renders as the empty string, which is how it is stored on disk.
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(text) => f.write_str(text),
            Self::Integer(number) => write!(f, "{number}"),
            Self::Bool(flag) => write!(f, "{flag}"),
        }
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::Null, Self::Integer)
    }
}

impl From<Option<bool>> for FieldValue {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Self::Null, Self::Bool)
    }
}

impl From<Option<HomeAway>> for FieldValue {
    fn from(value: Option<HomeAway>) -> Self {
        value.map_or(Self::Null, |side| Self::Text(side.as_str().to_owned()))
    }
}

/// One of the two competitors in a match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSide {
    /// Source identifier of the team.
    pub id: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Short code, e.g. `ENG`.
    pub abbreviation: Option<String>,
    /// Home/away tag as reported by the source.
    pub home_away: Option<HomeAway>,
    /// Points scored; `None` for unplayed or postponed matches.
    pub score: Option<i64>,
    /// Whether the source marks this side as the winner.
    pub winner: Option<bool>,
}

impl TeamSide {
    /// Column suffixes, in schema order, appended to `team_1_` / `team_2_`.
    pub const COLUMN_SUFFIXES: [&'static str; 6] =
        ["id", "name", "abbreviation", "home_away", "score", "winner"];

    fn values(&self) -> [FieldValue; 6] {
        [
            self.id.clone().into(),
            self.name.clone().into(),
            self.abbreviation.clone().into(),
            self.home_away.into(),
            self.score.into(),
            self.winner.into(),
        ]
    }

    fn from_cells(cells: &CellReader<'_, '_>, prefix: &str) -> Result<Self, RowError> {
        let column = |suffix: &str| format!("{prefix}_{suffix}");
        Ok(Self {
            id: cells.text(&column("id"))?,
            name: cells.text(&column("name"))?,
            abbreviation: cells.text(&column("abbreviation"))?,
            home_away: cells.home_away(&column("home_away"))?,
            score: cells.integer(&column("score"))?,
            winner: cells.boolean(&column("winner"))?,
        })
    }
}

/// One flattened match: a single row of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Calendar day the match was harvested for. Always present.
    pub match_date: NaiveDate,
    /// Kickoff time as reported by the source, in UTC.
    pub kickoff: Option<DateTime<Utc>>,
    /// Source identifier of the match.
    pub match_id: Option<String>,
    /// Source-wide unique identifier of the match.
    pub unique_id: Option<String>,
    /// Competition (league or tournament) name.
    pub competition: Option<String>,
    /// Season year of the competition.
    pub season: Option<i64>,
    /// Venue name.
    pub venue: Option<String>,
    /// Venue city.
    pub city: Option<String>,
    /// Venue state or region.
    pub state: Option<String>,
    /// Whether the match was played at a neutral venue.
    pub neutral_site: Option<bool>,
    /// Whether the venue is indoors.
    pub indoor: Option<bool>,
    /// First competitor listed by the source.
    pub team_1: TeamSide,
    /// Second competitor listed by the source.
    pub team_2: TeamSide,
}

impl MatchRecord {
    /// Column names in schema order. This is the header row on disk.
    pub const COLUMNS: [&'static str; COLUMN_COUNT] = [
        "match_date",
        "kickoff",
        "match_id",
        "unique_id",
        "competition",
        "season",
        "venue",
        "city",
        "state",
        "neutral_site",
        "indoor",
        "team_1_id",
        "team_1_name",
        "team_1_abbreviation",
        "team_1_home_away",
        "team_1_score",
        "team_1_winner",
        "team_2_id",
        "team_2_name",
        "team_2_abbreviation",
        "team_2_home_away",
        "team_2_score",
        "team_2_winner",
    ];

    /// Create a record for `match_date` with every other field null.
    pub fn new(match_date: NaiveDate) -> Self {
        Self {
            match_date,
            kickoff: None,
            match_id: None,
            unique_id: None,
            competition: None,
            season: None,
            venue: None,
            city: None,
            state: None,
            neutral_site: None,
            indoor: None,
            team_1: TeamSide::default(),
            team_2: TeamSide::default(),
        }
    }

    /// All cells in [`Self::COLUMNS`] order.
    pub fn values(&self) -> [FieldValue; COLUMN_COUNT] {
        let [t1_id, t1_name, t1_abbreviation, t1_home_away, t1_score, t1_winner] =
            self.team_1.values();
        let [t2_id, t2_name, t2_abbreviation, t2_home_away, t2_score, t2_winner] =
            self.team_2.values();
        [
            FieldValue::Text(self.match_date.format(DATE_FORMAT).to_string()),
            self.kickoff
                .map(|kickoff| kickoff.to_rfc3339_opts(SecondsFormat::Secs, true))
                .into(),
            self.match_id.clone().into(),
            self.unique_id.clone().into(),
            self.competition.clone().into(),
            self.season.into(),
            self.venue.clone().into(),
            self.city.clone().into(),
            self.state.clone().into(),
            self.neutral_site.into(),
            self.indoor.into(),
            t1_id,
            t1_name,
            t1_abbreviation,
            t1_home_away,
            t1_score,
            t1_winner,
            t2_id,
            t2_name,
            t2_abbreviation,
            t2_home_away,
            t2_score,
            t2_winner,
        ]
    }

    /// Look up a single cell by column name.
    ///
    /// Returns `None` only for names outside the schema; absent source
    /// fields come back as [`FieldValue::Null`].
    pub fn field(&self, column: &str) -> Option<FieldValue> {
        let index = Self::COLUMNS.iter().position(|name| *name == column)?;
        self.values().into_iter().nth(index)
    }

    /// Render the record as text cells in schema order.
    pub fn to_row(&self) -> Vec<String> {
        self.values().iter().map(ToString::to_string).collect()
    }

    /// Rebuild a record from a row, given a lookup from column name to cell.
    ///
    /// Empty cells become `None`. `match_date` must be present and parse.
    ///
    /// # Errors
    ///
    /// Returns [`RowError::MissingColumn`] if `cell` has no such column and
    /// [`RowError::InvalidValue`] if a cell does not parse.
    pub fn from_row<'a, F>(cell: F) -> Result<Self, RowError>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let cells = CellReader { cell: &cell };
        Ok(Self {
            match_date: cells.date("match_date")?,
            kickoff: cells.datetime("kickoff")?,
            match_id: cells.text("match_id")?,
            unique_id: cells.text("unique_id")?,
            competition: cells.text("competition")?,
            season: cells.integer("season")?,
            venue: cells.text("venue")?,
            city: cells.text("city")?,
            state: cells.text("state")?,
            neutral_site: cells.boolean("neutral_site")?,
            indoor: cells.boolean("indoor")?,
            team_1: TeamSide::from_cells(&cells, "team_1")?,
            team_2: TeamSide::from_cells(&cells, "team_2")?,
        })
    }
}

/// Parse a date-time as the source or an older export writes it.
///
/// Accepts RFC 3339, the minute-precision `2022-09-17T13:00Z` form the
/// scorepanel API uses, and naive `YYYY-MM-DD HH:MM:SS` taken as UTC.
pub fn parse_source_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%MZ", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Typed access to the cells of one row.
struct CellReader<'r, 'a> {
    cell: &'r dyn Fn(&str) -> Option<&'a str>,
}

impl<'a> CellReader<'_, 'a> {
    /// The cell exactly as stored; only an empty cell is null.
    fn verbatim(&self, column: &str) -> Result<Option<&'a str>, RowError> {
        let value = (self.cell)(column).ok_or_else(|| RowError::MissingColumn(column.to_owned()))?;
        Ok((!value.is_empty()).then_some(value))
    }

    /// The cell with surrounding whitespace removed, for typed columns.
    fn raw(&self, column: &str) -> Result<Option<&'a str>, RowError> {
        Ok(self
            .verbatim(column)?
            .map(str::trim)
            .filter(|value| !value.is_empty()))
    }

    fn text(&self, column: &str) -> Result<Option<String>, RowError> {
        Ok(self.verbatim(column)?.map(ToOwned::to_owned))
    }

    fn integer(&self, column: &str) -> Result<Option<i64>, RowError> {
        self.raw(column)?
            .map(|value| {
                value
                    .parse::<i64>()
                    .ok()
                    // Older exports wrote nullable integer columns as floats.
                    .or_else(|| value.strip_suffix(".0").and_then(|whole| whole.parse().ok()))
                    .ok_or_else(|| invalid(column, value, "expected an integer"))
            })
            .transpose()
    }

    fn boolean(&self, column: &str) -> Result<Option<bool>, RowError> {
        self.raw(column)?
            .map(|value| {
                if value.eq_ignore_ascii_case("true") {
                    Ok(true)
                } else if value.eq_ignore_ascii_case("false") {
                    Ok(false)
                } else {
                    Err(invalid(column, value, "expected true or false"))
                }
            })
            .transpose()
    }

    fn home_away(&self, column: &str) -> Result<Option<HomeAway>, RowError> {
        self.raw(column)?
            .map(|value| {
                HomeAway::parse(value).ok_or_else(|| invalid(column, value, "expected home or away"))
            })
            .transpose()
    }

    fn date(&self, column: &str) -> Result<NaiveDate, RowError> {
        let value = self
            .raw(column)?
            .ok_or_else(|| invalid(column, "", "a date is required"))?;
        NaiveDate::parse_from_str(value, DATE_FORMAT)
            .ok()
            .or_else(|| parse_source_datetime(value).map(|stamp| stamp.date_naive()))
            .ok_or_else(|| invalid(column, value, "expected YYYY-MM-DD"))
    }

    fn datetime(&self, column: &str) -> Result<Option<DateTime<Utc>>, RowError> {
        self.raw(column)?
            .map(|value| {
                parse_source_datetime(value)
                    .ok_or_else(|| invalid(column, value, "expected an RFC 3339 date-time"))
            })
            .transpose()
    }
}

fn invalid(column: &str, value: &str, reason: &str) -> RowError {
    RowError::InvalidValue {
        column: column.to_owned(),
        value: value.to_owned(),
        reason: reason.to_owned(),
    }
}
