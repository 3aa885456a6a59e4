// tests/common/mod.rs
// Shared test utilities for integration tests
#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::NamedTempFile;

const BINARY: &str = env!("CARGO_BIN_EXE_keystat");

/// Command for the built binary, isolated from config files and KEYSTAT_* env
pub fn keystat_command(args: &[&str]) -> Command {
    let mut cmd = Command::new(BINARY);
    cmd.arg("--ignore-config")
        .args(args)
        .env_remove("KEYSTAT_THREADS")
        .env_remove("KEYSTAT_MIN_CHUNK_SIZE")
        .env_remove("KEYSTAT_MAX_CHUNK_SIZE")
        .env_remove("KEYSTAT_SMALL_INPUT_THRESHOLD")
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

fn into_parts(output: Output) -> (String, String, i32) {
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Run keystat with the given arguments and input via stdin
pub fn run_keystat_with_input(args: &[&str], input: &[u8]) -> (String, String, i32) {
    let mut child = keystat_command(args)
        .stdin(Stdio::piped())
        .spawn()
        .expect("Failed to start keystat");

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input).expect("Failed to write to stdin");
    }

    into_parts(child.wait_with_output().expect("Failed to read output"))
}

/// Run keystat with the given arguments and no stdin
pub fn run_keystat(args: &[&str]) -> (String, String, i32) {
    let output = keystat_command(args)
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute keystat");
    into_parts(output)
}

/// Run keystat on a temporary file holding `content`; the file path is
/// passed as the input argument after `args`
pub fn run_keystat_with_file(args: &[&str], content: &[u8]) -> (String, String, i32) {
    let file = temp_input(content);
    let mut full_args = args.to_vec();
    full_args.push(file.path().to_str().unwrap());
    run_keystat(&full_args)
}

pub fn temp_input(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content).expect("Failed to write temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

/// Arguments that force many tiny chunks on several workers
pub fn tiny_chunk_args(threads: &'static str) -> Vec<&'static str> {
    vec![
        "--threads",
        threads,
        "--min-chunk-size",
        "1",
        "--max-chunk-size",
        "16",
        "--small-input-threshold",
        "0",
    ]
}

/// Deterministic measurement-style input with `lines` lines
pub fn generate_measurements(lines: usize) -> Vec<u8> {
    let stations = ["Oslo", "Paris", "Lima", "Tokyo", "athens", "Zurich", "Ürümqi"];
    let mut data = Vec::new();
    for i in 0..lines {
        let station = stations[(i * 7 + i / 3) % stations.len()];
        let whole = (i * 37 % 101) as i64 - 50;
        data.extend_from_slice(format!("{};{}.{}\n", station, whole, i % 10).as_bytes());
    }
    data
}

pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
