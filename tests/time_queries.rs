use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use azely::providers::{degrees, hours};
use azely::time::{Time, TimeError, Zone, parse_datetime, parse_step};

fn separator() -> Regex {
    Regex::new(r"\s*;\s*").unwrap()
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
}

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    at(y, m, d, h, min).and_utc()
}

fn zoned(text: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(text).unwrap()
}

#[test]
fn empty_query_means_today() {
    assert_eq!(Time::from_query("", &separator()).unwrap(), Time::default());
    assert_eq!(Time::from_query(" ; ; ", &separator()).unwrap(), Time::default());
}

#[test]
fn items_are_positional() {
    let time = Time::from_query("2020-01-01; 2020-01-07; 1h; Asia/Tokyo", &separator()).unwrap();
    assert_eq!(time.start, "2020-01-01");
    assert_eq!(time.stop, "2020-01-07");
    assert_eq!(time.step, "1h");
    assert_eq!(time.timezone, "Asia/Tokyo");

    let time = Time::from_query("now;;;+09:00", &separator()).unwrap();
    assert_eq!(time.start, "now");
    assert_eq!(time.stop, "00:00 tomorrow");
    assert_eq!(time.step, "10min");
    assert_eq!(time.timezone, "+09:00");
}

#[test]
fn malformed_items_are_rejected() {
    let sep = separator();
    assert_eq!(Time::from_query("a;b;c;d;e", &sep), Err(TimeError::TooManyItems(5)));
    assert_eq!(
        Time::from_query("someday", &sep),
        Err(TimeError::Expression("someday".to_owned()))
    );
    assert_eq!(Time::from_query(";;1 week", &sep), Err(TimeError::Step("1 week".to_owned())));
    assert_eq!(
        Time::from_query(";;;Asia Tokyo", &sep),
        Err(TimeError::Timezone("Asia Tokyo".to_owned()))
    );
    assert_eq!(
        Time::from_query("2020-01-01; 2020-01-02; 30min; Not/AZone", &sep),
        Err(TimeError::Timezone("Not/AZone".to_owned()))
    );
    assert_eq!(Time::from_query(";;;+25:00", &sep), Err(TimeError::Timezone("+25:00".to_owned())));
}

#[test]
fn index_is_left_inclusive() {
    let time = Time::from_query("2020-01-01;2020-01-02;10min", &separator()).unwrap();
    let index = time.index(utc(2024, 6, 1, 0, 0), "").unwrap();
    assert_eq!(index.len(), 144);
    assert_eq!(index[0], zoned("2020-01-01T00:00:00Z"));
    assert_eq!(index[143], zoned("2020-01-01T23:50:00Z"));
}

#[test]
fn ranges_are_read_in_their_timezone() {
    let sep = separator();
    let now = utc(2024, 6, 1, 0, 0);
    let tokyo = Time::from_query("2020-01-01; 2020-01-02; 1h; Asia/Tokyo", &sep).unwrap();
    let london = Time::from_query("2020-01-01; 2020-01-02; 1h; UTC", &sep).unwrap();
    let tokyo = tokyo.index(now, "").unwrap();
    let london = london.index(now, "").unwrap();
    assert_ne!(tokyo, london);
    assert_eq!(tokyo[0], zoned("2020-01-01T00:00:00+09:00"));
    assert_eq!(tokyo[0].offset().local_minus_utc(), 9 * 3600);
    assert_eq!(london[0], zoned("2020-01-01T00:00:00Z"));

    let fixed = Time::from_query("2020-01-01; 2020-01-02; 1h; -03:30", &sep).unwrap();
    assert_eq!(fixed.index(now, "").unwrap()[0], zoned("2020-01-01T00:00:00-03:30"));
}

#[test]
fn ranges_without_timezone_use_the_location() {
    let time = Time::from_query("2020-01-01; 2020-01-02; 1h", &separator()).unwrap();
    let now = utc(2024, 6, 1, 0, 0);
    assert_eq!(time.zone("America/Santiago").unwrap(), Zone::parse("America/Santiago").unwrap());
    assert_eq!(time.index(now, "Asia/Tokyo").unwrap()[0], zoned("2020-01-01T00:00:00+09:00"));
    assert_eq!(time.index(now, "").unwrap()[0], zoned("2020-01-01T00:00:00Z"));
    assert!(matches!(time.index(now, "Not/AZone"), Err(TimeError::Timezone(_))));

    let own = Time::from_query("2020-01-01; 2020-01-02; 1h; UTC", &separator()).unwrap();
    assert_eq!(own.index(now, "Asia/Tokyo").unwrap()[0], zoned("2020-01-01T00:00:00Z"));
}

#[test]
fn today_follows_the_local_date() {
    // 20:00 UTC is already the next day in Tokyo
    let now = utc(2020, 3, 1, 20, 0);
    let today = Time::from_query(";;1h;Asia/Tokyo", &separator()).unwrap();
    let index = today.index(now, "").unwrap();
    assert_eq!(index.len(), 24);
    assert_eq!(index[0], zoned("2020-03-02T00:00:00+09:00"));
}

#[test]
fn steps_cross_daylight_saving_changes_in_absolute_time() {
    // clocks in New York jumped from 02:00 to 03:00 on 2020-03-08
    let time = Time::from_query("2020-03-08; 2020-03-09; 1h; America/New_York", &separator()).unwrap();
    let index = time.index(utc(2024, 1, 1, 0, 0), "").unwrap();
    assert_eq!(index.len(), 23);
    assert_eq!(index[2], zoned("2020-03-08T03:00:00-04:00"));
}

#[test]
fn huge_steps_end_the_range_instead_of_overflowing() {
    let sep = separator();
    let time = Time::from_query("2020-01-01; 2020-01-02; 100000000d", &sep).unwrap();
    let index = time.index(utc(2024, 1, 1, 0, 0), "").unwrap();
    assert_eq!(index, vec![zoned("2020-01-01T00:00:00Z")]);

    let time = Time::from_query("2020-01-01; 2020-01-02; 100000000d; Asia/Tokyo", &sep).unwrap();
    assert_eq!(time.index(utc(2024, 1, 1, 0, 0), "").unwrap().len(), 1);
}

#[test]
fn empty_and_reversed_ranges_have_no_instants() {
    let sep = separator();
    let now = utc(2024, 1, 1, 0, 0);
    let same = Time::from_query("2020-01-01; 2020-01-01; 1h", &sep).unwrap();
    assert!(same.index(now, "").unwrap().is_empty());
    let reversed = Time::from_query("2020-01-02; 2020-01-01; 1h", &sep).unwrap();
    assert!(reversed.index(now, "").unwrap().is_empty());
    let yesterday = Time::from_query("00:00 today; 00:00 yesterday", &sep).unwrap();
    assert!(yesterday.index(now, "").unwrap().is_empty());
}

#[test]
fn relative_expressions_follow_now() {
    let now = at(2020, 3, 1, 8, 30);
    assert_eq!(parse_datetime("now", now).unwrap(), now);
    assert_eq!(parse_datetime("00:00 today", now).unwrap(), at(2020, 3, 1, 0, 0));
    assert_eq!(parse_datetime("12:00 tomorrow", now).unwrap(), at(2020, 3, 2, 12, 0));
    assert_eq!(parse_datetime("Yesterday", now).unwrap(), at(2020, 2, 29, 0, 0));
    assert_eq!(parse_datetime("2020-01-01 06:15", now).unwrap(), at(2020, 1, 1, 6, 15));
    assert_eq!(parse_datetime("2020-01-01T06:15:00", now).unwrap(), at(2020, 1, 1, 6, 15));
    assert!(parse_datetime("25:00 today", now).is_err());

    let time = Time::default();
    let index = time.index(now.and_utc(), "").unwrap();
    assert_eq!(index.len(), 144, "a default range covers the day of now");
    assert_eq!(index[0], zoned("2020-03-01T00:00:00Z"));
}

#[test]
fn steps_accept_common_units() {
    assert_eq!(parse_step("30s").unwrap(), Duration::seconds(30));
    assert_eq!(parse_step("5 min").unwrap(), Duration::minutes(5));
    assert_eq!(parse_step("10T").unwrap(), Duration::minutes(10));
    assert_eq!(parse_step("2H").unwrap(), Duration::hours(2));
    assert_eq!(parse_step("1day").unwrap(), Duration::days(1));
    assert!(parse_step("0min").is_err());
    assert!(parse_step("min").is_err());
    assert!(parse_step("-5min").is_err());
}

#[test]
fn step_bounds() {
    assert_eq!(parse_step("100000000d").unwrap(), Duration::days(100_000_000));
    assert_eq!(parse_step("106751991166d").unwrap(), Duration::days(106_751_991_166));
    assert_eq!(parse_step("999999999999d"), Err(TimeError::Step("999999999999d".to_owned())));
    assert_eq!(
        parse_step("99999999999999999999s"),
        Err(TimeError::Step("99999999999999999999s".to_owned()))
    );
}

#[test]
fn sexagesimal_formatting() {
    assert_eq!(hours(40.669629), "02h42m40.711s");
    assert_eq!(degrees(-0.013293), "-00d00m47.855s");
    assert_eq!(degrees(0.0), "+00d00m00.000s");
    assert_eq!(hours(0.0), "00h00m00.000s");
    assert_eq!(hours(359.9999999), "00h00m00.000s", "right ascension wraps at 24h");
    assert_eq!(hours(360.0), "00h00m00.000s");
    assert_eq!(hours(-15.0), "23h00m00.000s");
}
