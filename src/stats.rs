//! Summary statistics derived from the sighting log.
//!
//! Pure aggregation over fetched rows, recomputed per request. Local time is
//! an explicit offset parameter so the hour-bucket logic stays deterministic
//! under test.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Timelike, Utc};

/// The columns the aggregation needs from one log row.
#[derive(Debug, Clone)]
pub struct StatsRow {
    pub seen_at: DateTime<Utc>,
    pub icao24: String,
    pub operator: Option<String>,
    pub type_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BusiestHour {
    /// Local hour of day, 0-23.
    pub hour: u32,
    pub total: usize,
    pub average_per_day: f64,
}

#[derive(Debug, Clone, Default)]
pub struct FlightStats {
    pub total_sightings: usize,
    pub today_sightings: usize,
    pub today_unique_aircraft: usize,
    pub busiest_hour: Option<BusiestHour>,
    pub top_operator: Option<(String, usize)>,
    pub rarest_type: Option<(String, usize)>,
    pub longest_gap: Option<Duration>,
    /// Consecutive local-time hour buckets, counting back from the current
    /// hour, that each contain at least one sighting. Zero when the current
    /// hour bucket is empty.
    pub current_streak_hours: usize,
}

pub fn compute_stats(rows: &[StatsRow], now: DateTime<Utc>, offset: FixedOffset) -> FlightStats {
    if rows.is_empty() {
        return FlightStats::default();
    }

    let local = |t: DateTime<Utc>| t.with_timezone(&offset);
    let today = local(now).date_naive();

    let mut today_sightings = 0;
    let mut today_aircraft: HashSet<&str> = HashSet::new();
    let mut hour_counts = [0usize; 24];
    let mut days: HashSet<NaiveDate> = HashSet::new();
    let mut operators: HashMap<&str, usize> = HashMap::new();
    let mut types: HashMap<&str, usize> = HashMap::new();
    let mut hour_buckets: HashSet<(NaiveDate, u32)> = HashSet::new();
    let mut timestamps: Vec<DateTime<Utc>> = Vec::with_capacity(rows.len());

    for row in rows {
        let at = local(row.seen_at);
        let date = at.date_naive();
        if date == today {
            today_sightings += 1;
            today_aircraft.insert(&row.icao24);
        }
        hour_counts[at.hour() as usize] += 1;
        days.insert(date);
        hour_buckets.insert((date, at.hour()));
        if let Some(operator) = row.operator.as_deref() {
            *operators.entry(operator).or_default() += 1;
        }
        if let Some(type_code) = row.type_code.as_deref() {
            *types.entry(type_code).or_default() += 1;
        }
        timestamps.push(row.seen_at);
    }

    let busiest_hour = hour_counts
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count > 0)
        .max_by_key(|&(_, &count)| count)
        .map(|(hour, &total)| BusiestHour {
            hour: hour as u32,
            total,
            average_per_day: total as f64 / days.len() as f64,
        });

    // Deterministic tie-breaks: highest count then first name; lowest count
    // then first code.
    let top_operator = operators
        .into_iter()
        .min_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)))
        .map(|(name, count)| (name.to_string(), count));
    let rarest_type = types
        .into_iter()
        .min_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(b.0)))
        .map(|(code, count)| (code.to_string(), count));

    timestamps.sort_unstable();
    let longest_gap = timestamps
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .max();

    let mut current_streak_hours = 0;
    loop {
        let cursor = local(now - Duration::hours(current_streak_hours as i64));
        if hour_buckets.contains(&(cursor.date_naive(), cursor.hour())) {
            current_streak_hours += 1;
        } else {
            break;
        }
    }

    FlightStats {
        total_sightings: rows.len(),
        today_sightings,
        today_unique_aircraft: today_aircraft.len(),
        busiest_hour,
        top_operator,
        rarest_type,
        longest_gap,
        current_streak_hours,
    }
}

pub fn format_stats(stats: &FlightStats) -> String {
    let mut out = String::new();
    out.push_str(&format!("Total sightings:   {}\n", stats.total_sightings));
    out.push_str(&format!(
        "Today:             {} sightings, {} aircraft\n",
        stats.today_sightings, stats.today_unique_aircraft
    ));
    match &stats.busiest_hour {
        Some(busiest) => out.push_str(&format!(
            "Busiest hour:      {:02}:00 ({} total, {:.1}/day)\n",
            busiest.hour, busiest.total, busiest.average_per_day
        )),
        None => out.push_str("Busiest hour:      -\n"),
    }
    match &stats.top_operator {
        Some((name, count)) => {
            out.push_str(&format!("Top operator:      {} ({})\n", name, count))
        }
        None => out.push_str("Top operator:      -\n"),
    }
    match &stats.rarest_type {
        Some((code, count)) => {
            out.push_str(&format!("Rarest type:       {} ({})\n", code, count))
        }
        None => out.push_str("Rarest type:       -\n"),
    }
    match stats.longest_gap {
        Some(gap) => out.push_str(&format!(
            "Longest gap:       {}h {}m\n",
            gap.num_hours(),
            gap.num_minutes() % 60
        )),
        None => out.push_str("Longest gap:       -\n"),
    }
    out.push_str(&format!(
        "Current streak:    {} hour(s)\n",
        stats.current_streak_hours
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc_offset() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn row(seen_at: DateTime<Utc>, icao24: &str) -> StatsRow {
        StatsRow {
            seen_at,
            icao24: icao24.to_string(),
            operator: None,
            type_code: None,
        }
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 23, hour, minute, 0).unwrap()
    }

    #[test]
    fn empty_log_yields_defaults() {
        let stats = compute_stats(&[], Utc::now(), utc_offset());
        assert_eq!(stats.total_sightings, 0);
        assert_eq!(stats.current_streak_hours, 0);
        assert!(stats.busiest_hour.is_none());
    }

    #[test]
    fn streak_is_zero_when_current_hour_is_empty() {
        // Sightings in H-3, H-2, H-1 but none in the current hour.
        let now = at(12, 30);
        let rows = vec![row(at(9, 10), "a"), row(at(10, 20), "b"), row(at(11, 50), "c")];
        let stats = compute_stats(&rows, now, utc_offset());
        assert_eq!(stats.current_streak_hours, 0);
    }

    #[test]
    fn streak_counts_back_to_first_gap() {
        let now = at(12, 30);
        let rows = vec![
            row(at(12, 5), "a"),
            row(at(11, 40), "b"),
            row(at(10, 15), "c"),
            // 09:00 bucket empty, 08:00 occupied: must not count.
            row(at(8, 30), "d"),
        ];
        let stats = compute_stats(&rows, now, utc_offset());
        assert_eq!(stats.current_streak_hours, 3);
    }

    #[test]
    fn busiest_hour_and_average() {
        // Two days of data; 10:00 has three sightings across both days.
        let rows = vec![
            row(Utc.with_ymd_and_hms(2026, 8, 22, 10, 0, 0).unwrap(), "a"),
            row(Utc.with_ymd_and_hms(2026, 8, 22, 10, 30, 0).unwrap(), "b"),
            row(Utc.with_ymd_and_hms(2026, 8, 23, 10, 10, 0).unwrap(), "c"),
            row(Utc.with_ymd_and_hms(2026, 8, 23, 14, 0, 0).unwrap(), "d"),
        ];
        let stats = compute_stats(&rows, at(15, 0), utc_offset());
        let busiest = stats.busiest_hour.unwrap();
        assert_eq!(busiest.hour, 10);
        assert_eq!(busiest.total, 3);
        assert!((busiest.average_per_day - 1.5).abs() < 1e-9);
    }

    #[test]
    fn today_counts_unique_aircraft() {
        let rows = vec![
            row(at(9, 0), "aaa"),
            row(at(10, 0), "aaa"),
            row(at(11, 0), "bbb"),
            // Yesterday: excluded from today's figures.
            row(Utc.with_ymd_and_hms(2026, 8, 22, 9, 0, 0).unwrap(), "ccc"),
        ];
        let stats = compute_stats(&rows, at(12, 0), utc_offset());
        assert_eq!(stats.total_sightings, 4);
        assert_eq!(stats.today_sightings, 3);
        assert_eq!(stats.today_unique_aircraft, 2);
    }

    #[test]
    fn operator_and_type_aggregates() {
        let mut rows = vec![
            row(at(9, 0), "a"),
            row(at(10, 0), "b"),
            row(at(11, 0), "c"),
        ];
        rows[0].operator = Some("KLM".into());
        rows[0].type_code = Some("B738".into());
        rows[1].operator = Some("KLM".into());
        rows[1].type_code = Some("B738".into());
        rows[2].operator = Some("Transavia".into());
        rows[2].type_code = Some("A20N".into());

        let stats = compute_stats(&rows, at(12, 0), utc_offset());
        assert_eq!(stats.top_operator, Some(("KLM".to_string(), 2)));
        assert_eq!(stats.rarest_type, Some(("A20N".to_string(), 1)));
    }

    #[test]
    fn longest_gap_between_consecutive_sightings() {
        let rows = vec![row(at(8, 0), "a"), row(at(9, 0), "b"), row(at(12, 0), "c")];
        let stats = compute_stats(&rows, at(12, 30), utc_offset());
        assert_eq!(stats.longest_gap, Some(Duration::hours(3)));
    }

    #[test]
    fn local_offset_moves_hour_buckets() {
        // 23:30 UTC on the 22nd is 01:30 on the 23rd at +02:00.
        let rows = vec![row(Utc.with_ymd_and_hms(2026, 8, 22, 23, 30, 0).unwrap(), "a")];
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 8, 23, 1, 45, 0).unwrap();
        let stats = compute_stats(&rows, now, offset);
        assert_eq!(stats.today_sightings, 1);
        assert_eq!(stats.current_streak_hours, 1);
        assert_eq!(stats.busiest_hour.unwrap().hour, 1);
    }
}
