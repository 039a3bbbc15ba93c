//! Unit tests for the stable encodings shared by storage and remote documents.

use chrono::NaiveDate;
use paceline::calendar::{decode_date, encode_date};
use paceline::{Gender, RunType};

#[test]
fn test_run_type_encoding() {
    for run_type in [RunType::EasyAerobic, RunType::Tempo] {
        let decoded: RunType = run_type.as_str().parse().unwrap();
        assert_eq!(decoded, run_type);

        let json = serde_json::to_string(&run_type).unwrap();
        assert_eq!(json, format!("\"{}\"", run_type.as_str()));
    }
    assert_eq!(RunType::EasyAerobic.as_str(), "ZONE2");
    assert_eq!(RunType::Tempo.as_str(), "TEMPO");
}

#[test]
fn test_gender_encoding() {
    for gender in [Gender::Male, Gender::Female] {
        let decoded: Gender = gender.as_str().parse().unwrap();
        assert_eq!(decoded, gender);

        let json = serde_json::to_string(&gender).unwrap();
        assert_eq!(serde_json::from_str::<Gender>(&json).unwrap(), gender);
    }
    assert_eq!(Gender::Female.as_str(), "FEMALE");
}

#[test]
fn test_unknown_variants_rejected() {
    let err = "INTERVALS".parse::<RunType>().unwrap_err();
    assert_eq!(err.value, "INTERVALS");
    assert!("other".parse::<Gender>().is_err());
}

#[test]
fn test_calendar_date_encoding() {
    let dates = [
        NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
        NaiveDate::from_ymd_opt(1999, 12, 31).unwrap(),
    ];
    for date in dates {
        assert_eq!(decode_date(&encode_date(date)).unwrap(), date);
    }
    assert_eq!(encode_date(dates[1]), "2026-03-15");
}
