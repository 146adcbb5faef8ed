//! Tests for command-line argument parsing
//!
//! Note: These tests verify the argument parser configuration by creating
//! a test parser with the same structure as the main application.

use clap::{Arg, ArgAction, Command as ClapCommand};

/// Create a command with the same argument structure as the main binary
fn create_test_command() -> ClapCommand {
    ClapCommand::new("heart-rate-monitor")
        .version("0.1.0")
        .about("Heart rate estimation from fingertip camera traces")
        .arg(
            Arg::new("trace")
                .short('t')
                .long("trace")
                .value_name("PATH")
                .conflicts_with("synthetic")
                .help("Trace file"),
        )
        .arg(
            Arg::new("synthetic")
                .short('s')
                .long("synthetic")
                .value_name("BPM")
                .value_parser(clap::value_parser!(f64))
                .help("Synthetic pulse rate"),
        )
        .arg(
            Arg::new("duration")
                .long("duration")
                .value_parser(clap::value_parser!(u64))
                .default_value("30")
                .help("Synthetic signal length in seconds"),
        )
        .arg(
            Arg::new("fps")
                .long("fps")
                .value_parser(clap::value_parser!(f64))
                .default_value("30")
                .help("Synthetic frame rate"),
        )
        .arg(
            Arg::new("average-after")
                .short('a')
                .long("average-after")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u32))
                .help("Time-domain averaging period"),
        )
        .arg(
            Arg::new("window")
                .short('w')
                .long("window")
                .value_parser(clap::value_parser!(usize))
                .help("FFT window size"),
        )
        .arg(
            Arg::new("debounce")
                .long("debounce")
                .value_parser(clap::value_parser!(u64))
                .help("Finger debounce in milliseconds"),
        )
        .arg(
            Arg::new("realtime")
                .long("realtime")
                .action(ArgAction::SetTrue)
                .help("Replay at recorded pace"),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Enable debug output"),
        )
        .arg(
            Arg::new("config")
                .short('C')
                .long("config")
                .value_name("PATH")
                .help("Configuration file"),
        )
}

#[test]
fn test_help_argument() {
    let cmd = create_test_command();
    let result = cmd.try_get_matches_from(vec!["heart-rate-monitor", "--help"]);

    assert!(result.is_err());
    let err = result.unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
}

#[test]
fn test_no_arguments() {
    let cmd = create_test_command();
    let matches = cmd.try_get_matches_from(vec!["heart-rate-monitor"]).unwrap();

    assert_eq!(matches.get_one::<u64>("duration"), Some(&30));
    assert_eq!(matches.get_one::<f64>("fps"), Some(&30.0));
    assert!(matches.get_one::<u32>("average-after").is_none());
    assert!(!matches.get_flag("realtime"));
}

#[test]
fn test_trace_argument() {
    let cmd = create_test_command();
    let matches = cmd
        .try_get_matches_from(vec!["heart-rate-monitor", "--trace", "finger.txt"])
        .unwrap();
    assert_eq!(
        matches.get_one::<String>("trace").map(|s| s.as_str()),
        Some("finger.txt")
    );
}

#[test]
fn test_trace_conflicts_with_synthetic() {
    let cmd = create_test_command();
    let result = cmd.try_get_matches_from(vec![
        "heart-rate-monitor",
        "--trace",
        "finger.txt",
        "--synthetic",
        "70",
    ]);
    assert_eq!(result.unwrap_err().kind(), clap::error::ErrorKind::ArgumentConflict);
}

#[test]
fn test_time_domain_arguments() {
    let cmd = create_test_command();
    let matches = cmd
        .try_get_matches_from(vec!["heart-rate-monitor", "-s", "65", "-a", "10", "--debounce", "1500"])
        .unwrap();
    assert_eq!(matches.get_one::<f64>("synthetic"), Some(&65.0));
    assert_eq!(matches.get_one::<u32>("average-after"), Some(&10));
    assert_eq!(matches.get_one::<u64>("debounce"), Some(&1500));
}

#[test]
fn test_invalid_numeric_values() {
    let cmd = create_test_command();
    assert!(cmd
        .clone()
        .try_get_matches_from(vec!["heart-rate-monitor", "--window", "big"])
        .is_err());
    assert!(cmd
        .try_get_matches_from(vec!["heart-rate-monitor", "--average-after", "-5"])
        .is_err());
}

#[test]
fn test_flags_and_config() {
    let cmd = create_test_command();
    let matches = cmd
        .try_get_matches_from(vec!["heart-rate-monitor", "-d", "--realtime", "-C", "hrm.yaml"])
        .unwrap();
    assert!(matches.get_flag("debug"));
    assert!(matches.get_flag("realtime"));
    assert_eq!(
        matches.get_one::<String>("config").map(|s| s.as_str()),
        Some("hrm.yaml")
    );
}
