mod common;
use common::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_end_to_end_example() {
    let input = b"Paris;10.0\nParis;20.0\nOslo;-5.5\nOslo;-5.5\n";
    let (stdout, stderr, exit_code) = run_keystat_with_file(&[], input);

    assert_eq!(exit_code, 0, "keystat should succeed, stderr: {}", stderr);
    assert_eq!(stdout, "Oslo=-5.5/-5.5/-5.5\nParis=10.0/15.0/20.0\n");
}

#[test]
fn test_malformed_lines_are_skipped() {
    let input = b"CityA;12.3\nGARBAGE\nCityA;10.1\n";
    let (stdout, _stderr, exit_code) = run_keystat_with_file(&[], input);

    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "CityA=10.1/11.2/12.3\n");
}

#[test]
fn test_every_kind_of_malformed_line() {
    let input = b"no delimiter\na;b;1.0\n;2.0\nkey;abc\nkey;NaN\nkey;inf\n\nok;1.0\n";
    let (stdout, stderr, exit_code) = run_keystat_with_file(&["--stats=json"], input);

    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "ok=1.0/1.0/1.0\n");

    let stats: serde_json::Value = serde_json::from_str(&stderr).expect("stats should be JSON");
    assert_eq!(stats["lines_read"], 8);
    assert_eq!(stats["lines_parsed"], 1);
    assert_eq!(stats["malformed"]["missing_delimiter"], 2);
    assert_eq!(stats["malformed"]["ambiguous_key"], 1);
    assert_eq!(stats["malformed"]["empty_key"], 1);
    assert_eq!(stats["malformed"]["invalid_value"], 3);
}

#[test]
fn test_stdin_input() {
    let (stdout, _stderr, exit_code) =
        run_keystat_with_input(&["-"], b"b;1.0\na;2.0\nb;3.0\n");

    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "a=2.0/2.0/2.0\nb=1.0/2.0/3.0\n");
}

#[test]
fn test_input_without_trailing_newline() {
    let (stdout, _stderr, exit_code) = run_keystat_with_file(&[], b"x;1.5\nx;2.5");
    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "x=1.5/2.0/2.5\n");
}

#[test]
fn test_crlf_input_matches_lf_input() {
    let lf = generate_measurements(300);
    let crlf: Vec<u8> = String::from_utf8(lf.clone())
        .unwrap()
        .replace('\n', "\r\n")
        .into_bytes();

    let (lf_out, _, lf_code) = run_keystat_with_file(&[], &lf);
    let (crlf_out, _, crlf_code) = run_keystat_with_file(&[], &crlf);

    assert_eq!(lf_code, 0);
    assert_eq!(crlf_code, 0);
    assert_eq!(lf_out, crlf_out);
}

#[test]
fn test_output_file_is_written() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("result.txt");
    let input = temp_input(b"k;1.0\nk;2.0\n");

    let (stdout, _stderr, exit_code) = run_keystat(&[
        input.path().to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
    ]);

    assert_eq!(exit_code, 0);
    assert!(stdout.is_empty(), "nothing goes to stdout with -o");
    assert_eq!(fs::read_to_string(&out).unwrap(), "k=1.0/1.5/2.0\n");
    // no staging files left behind
    assert_eq!(dir_entries(dir.path()), vec!["result.txt".to_string()]);
}

#[test]
fn test_output_file_is_replaced() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("result.txt");
    fs::write(&out, "stale content\n").unwrap();
    let input = temp_input(b"k;4.0\n");

    let (_stdout, _stderr, exit_code) = run_keystat(&[
        input.path().to_str().unwrap(),
        "--output",
        out.to_str().unwrap(),
    ]);

    assert_eq!(exit_code, 0);
    assert_eq!(fs::read_to_string(&out).unwrap(), "k=4.0/4.0/4.0\n");
}

#[test]
fn test_empty_input_produces_empty_output() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("empty.txt");
    let input = temp_input(b"");

    let (_stdout, _stderr, exit_code) = run_keystat(&[
        input.path().to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
    ]);

    assert_eq!(exit_code, 0);
    assert_eq!(fs::read(&out).unwrap(), b"");
}

#[test]
fn test_unicode_keys_sort_by_bytes() {
    let input = "Ürümqi;1.0\nZurich;2.0\nathens;3.0\nAthens;4.0\n";
    let (stdout, _stderr, exit_code) = run_keystat_with_file(&[], input.as_bytes());

    assert_eq!(exit_code, 0);
    assert_eq!(
        stdout,
        "Athens=4.0/4.0/4.0\nZurich=2.0/2.0/2.0\nathens=3.0/3.0/3.0\nÜrümqi=1.0/1.0/1.0\n"
    );
}
