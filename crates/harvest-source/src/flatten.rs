//! Conversion of one raw match into a flat record.
//!
//! The provider nests everything under `competitions[0]`: venue, flags and
//! the two competitors. The competition context (league name and season)
//! sits one level up, next to the list of events. Every optional field goes
//! through [`lookup`](crate::lookup::lookup), so a missing branch becomes a null
//! cell and never an error.

use chrono::NaiveDate;
use harvest_types::{HomeAway, MatchRecord, TeamSide, parse_source_datetime};
use serde_json::Value;

use crate::lookup::{lookup, lookup_bool, lookup_i64, lookup_str};

/// Flatten one event and its competition context into a [`MatchRecord`].
///
/// `match_date` is the day being harvested; it is stamped onto the record
/// regardless of the kickoff the provider reports, which is kept in
/// `kickoff`. Competitors are taken positionally (first is `team_1`) and
/// labelled by their own `homeAway` tag. Competitors beyond the second are
/// ignored and a missing one yields an all-null side.
pub fn flatten(event: &Value, competition: &Value, match_date: NaiveDate) -> MatchRecord {
    let mut record = MatchRecord::new(match_date);

    record.kickoff = lookup_str(event, "date").and_then(|raw| parse_source_datetime(&raw));
    record.match_id = lookup_str(event, "competitions.0.id");
    record.unique_id = lookup_str(event, "competitions.0.uid");
    record.venue = lookup_str(event, "competitions.0.venue.fullName");
    record.city = lookup_str(event, "competitions.0.venue.address.city");
    record.state = lookup_str(event, "competitions.0.venue.address.state");
    record.neutral_site = lookup_bool(event, "competitions.0.neutralSite");
    record.indoor = lookup_bool(event, "competitions.0.venue.indoor");

    record.competition = lookup_str(competition, "leagues.0.name");
    record.season = lookup_i64(competition, "season.year");

    record.team_1 = flatten_side(lookup(event, "competitions.0.competitors.0"));
    record.team_2 = flatten_side(lookup(event, "competitions.0.competitors.1"));

    record
}

fn flatten_side(competitor: Option<&Value>) -> TeamSide {
    let Some(competitor) = competitor else {
        return TeamSide::default();
    };
    TeamSide {
        id: lookup_str(competitor, "id"),
        name: lookup_str(competitor, "team.name"),
        abbreviation: lookup_str(competitor, "team.abbreviation"),
        home_away: lookup_str(competitor, "homeAway").and_then(|tag| HomeAway::parse(&tag)),
        score: lookup_i64(competitor, "score"),
        winner: lookup_bool(competitor, "winner"),
    }
}
