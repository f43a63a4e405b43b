//! The offline commands print JSON on stdout and nothing else.

use serde_json::Value;
use std::io::Write;
use std::process::Command;

const GLOBAL_CSV: &str = "\
Province/State,Country/Region,Lat,Long,3/1/20,3/2/20,3/3/20
,Italy,41.87,12.56,29,34,52
,,Malformed,row
";

fn run(args: &[&str]) -> Value {
    let output = Command::new(env!("CARGO_BIN_EXE_covid-dashboard"))
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("stdout is not JSON ({}): {}", e, stdout))
}

fn global_csv() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", GLOBAL_CSV).unwrap();
    file
}

#[test]
fn test_tidy_stdout_is_json() {
    let file = global_csv();
    let rows = run(&["tidy", "global", "--input", file.path().to_str().unwrap()]);

    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["Country/Region"], "Italy");
    assert_eq!(rows[2]["daily_change"], 18);
}

#[test]
fn test_chart_stdout_is_json() {
    let file = global_csv();
    let view = run(&[
        "chart",
        "global",
        "-e",
        "Italy",
        "-m",
        "daily",
        "--input",
        file.path().to_str().unwrap(),
    ]);

    assert_eq!(view["entities"][0], "Italy");
    assert_eq!(view["spec"]["yField"], "daily_roll_avg");
    assert_eq!(view["spec"]["data"].as_array().unwrap().len(), 3);
}

#[test]
fn test_home_stdout_is_json() {
    let home = run(&["home"]);
    assert_eq!(home["title"], "COVID-19 Dashboard");
}
