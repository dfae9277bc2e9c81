//! Saffron phenology calendar.
//!
//! The crop cycle is fixed to the calendar: leaves from June, flowers in the
//! first twenty days of October, harvest until the end of November, and the
//! corms lie dormant from December through May. Everything here is a pure
//! function of a date; the route supplies today's.

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Season {
    Dormancy,
    #[serde(rename = "Vegetative Growth")]
    Vegetative,
    Flowering,
    Harvest,
}

impl Season {
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Dormancy => "Dormancy",
            Season::Vegetative => "Vegetative Growth",
            Season::Flowering => "Flowering",
            Season::Harvest => "Harvest",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Season::Dormancy => "Corms are dormant underground. Minimal activity.",
            Season::Vegetative => "Leaves emerge and grow. Corms develop.",
            Season::Flowering => "Purple flowers bloom. Critical period for saffron production.",
            Season::Harvest => "Active harvesting of saffron stigmas.",
        }
    }

    pub fn care_tips(&self) -> &'static [&'static str] {
        match self {
            Season::Dormancy => &[
                "Minimal watering required",
                "Prepare soil for next cycle",
                "Check for pest damage in stored corms",
            ],
            Season::Vegetative => &[
                "Regular watering needed",
                "Apply organic fertilizer",
                "Monitor for weeds and pests",
                "Ensure good drainage",
            ],
            Season::Flowering => &[
                "Monitor daily for flower emergence",
                "Prepare for harvest",
                "Protect from heavy rain",
                "Early morning inspection recommended",
            ],
            Season::Harvest => &[
                "Harvest flowers early morning",
                "Pick flowers before they fully open",
                "Separate stigmas immediately",
                "Dry stigmas properly in shade",
                "Store in airtight containers",
            ],
        }
    }
}

/// First day (month, day) of each season, in calendar order.
const SEASON_STARTS: [(u32, u32, Season); 4] = [
    (6, 1, Season::Vegetative),
    (10, 1, Season::Flowering),
    (10, 21, Season::Harvest),
    (12, 1, Season::Dormancy),
];

/// Season in effect on `date`.
pub fn season_on(date: NaiveDate) -> Season {
    match date.month() {
        6..=9 => Season::Vegetative,
        10 if date.day() <= 20 => Season::Flowering,
        10 | 11 => Season::Harvest,
        _ => Season::Dormancy,
    }
}

/// The next season change strictly after `today`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextSeason {
    #[serde(rename = "next_season")]
    pub season: Season,
    #[serde(rename = "days_until_next")]
    pub days: i64,
    #[serde(rename = "next_season_date", serialize_with = "month_day")]
    pub date: NaiveDate,
}

fn month_day<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&date.format("%B %d"))
}

/// Next season start after `today`. In December every start left in the
/// year has passed, so the search runs into the following year.
///
/// `None` only past the end of chrono's representable calendar.
pub fn next_season(today: NaiveDate) -> Option<NextSeason> {
    // ---
    let year = today.year();
    [year, year + 1]
        .into_iter()
        .flat_map(|y| {
            SEASON_STARTS.iter().filter_map(move |&(m, d, season)| {
                NaiveDate::from_ymd_opt(y, m, d).map(|date| (date, season))
            })
        })
        .find(|(start, _)| *start > today)
        .map(|(date, season)| NextSeason {
            season,
            days: (date - today).num_days(),
            date,
        })
}

/// Body of `GET /api/season`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonReport {
    pub current_season: Season,
    pub description: &'static str,
    pub care_tips: &'static [&'static str],
    #[serde(flatten)]
    pub next: Option<NextSeason>,
}

pub fn report(today: NaiveDate) -> SeasonReport {
    let current = season_on(today);
    SeasonReport {
        current_season: current,
        description: current.description(),
        care_tips: current.care_tips(),
        next: next_season(today),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_season_boundaries() {
        // ---
        assert_eq!(season_on(day(2025, 5, 31)), Season::Dormancy);
        assert_eq!(season_on(day(2025, 6, 1)), Season::Vegetative);
        assert_eq!(season_on(day(2025, 9, 30)), Season::Vegetative);
        assert_eq!(season_on(day(2025, 10, 1)), Season::Flowering);
        assert_eq!(season_on(day(2025, 10, 20)), Season::Flowering);
        assert_eq!(season_on(day(2025, 10, 21)), Season::Harvest);
        assert_eq!(season_on(day(2025, 11, 30)), Season::Harvest);
        assert_eq!(season_on(day(2025, 12, 1)), Season::Dormancy);
        assert_eq!(season_on(day(2026, 1, 1)), Season::Dormancy);
    }

    #[test]
    fn test_next_season_within_year() {
        // ---
        let next = next_season(day(2025, 10, 20)).unwrap();
        assert_eq!(next.season, Season::Harvest);
        assert_eq!(next.days, 1);
        assert_eq!(next.date, day(2025, 10, 21));

        let next = next_season(day(2025, 11, 30)).unwrap();
        assert_eq!(next.season, Season::Dormancy);
        assert_eq!(next.days, 1);

        let next = next_season(day(2026, 5, 31)).unwrap();
        assert_eq!(next.season, Season::Vegetative);
        assert_eq!(next.days, 1);

        // A season's first day points at the one after it
        let next = next_season(day(2025, 6, 1)).unwrap();
        assert_eq!(next.season, Season::Flowering);
        assert_eq!(next.date, day(2025, 10, 1));
    }

    #[test]
    fn test_december_rolls_into_next_year() {
        // ---
        let next = next_season(day(2025, 12, 1)).unwrap();
        assert_eq!(next.season, Season::Vegetative);
        assert_eq!(next.date, day(2026, 6, 1));
        assert_eq!(next.days, 182);

        let next = next_season(day(2025, 12, 31)).unwrap();
        assert_eq!(next.date, day(2026, 6, 1));

        let next = next_season(day(2026, 1, 15)).unwrap();
        assert_eq!(next.date, day(2026, 6, 1));
        assert_eq!(next.days, 137);
    }

    #[test]
    fn test_report_json_shape() {
        // ---
        let json = serde_json::to_value(report(day(2025, 12, 1))).unwrap();
        assert_eq!(json["current_season"], "Dormancy");
        assert_eq!(json["description"], Season::Dormancy.description());
        assert_eq!(json["care_tips"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["next_season"], "Vegetative Growth");
        assert_eq!(json["days_until_next"], 182);
        assert_eq!(json["next_season_date"], "June 01");
    }
}
