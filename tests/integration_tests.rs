//! End-to-end tests for the `bff` binary

use std::path::Path;
use std::process::Command as ProcessCommand;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Test utilities for video processing
mod test_utils {
    use super::*;

    /// Render a clip with a run of black frames in the middle using the
    /// `ffmpeg` CLI. Returns `false` when no usable `ffmpeg` is installed.
    pub fn create_test_video(output_path: &Path) -> bool {
        let graph = "testsrc=duration=1:size=160x120:rate=25[a];\
                     color=c=black:size=160x120:duration=0.4:rate=25[b];\
                     testsrc=duration=1:size=160x120:rate=25[c];\
                     [a][b][c]concat=n=3:v=1:a=0[v];\
                     sine=frequency=440:sample_rate=44100:duration=2.4[s]";
        let status = ProcessCommand::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-filter_complex", graph])
            .args(["-map", "[v]", "-map", "[s]"])
            .args(["-c:v", "libx264", "-qp", "0", "-pix_fmt", "yuv420p"])
            .args(["-c:a", "aac", "-y"])
            .arg(output_path)
            .status();
        matches!(status, Ok(s) if s.success()) && output_path.exists()
    }

    /// A `bff` command isolated from the caller's configuration
    pub fn bff(workdir: &Path) -> Command {
        let mut cmd = Command::cargo_bin("bff").expect("bff binary");
        cmd.current_dir(workdir)
            .env_remove("BFF_CONFIG")
            .env_remove("BFF_CLASSIFIER")
            .env_remove("BFF_LOG_LEVEL")
            .env_remove("BFF_LOG_FORMAT")
            .env_remove("BFF_DEINTERLACE")
            .env_remove("BFF_PROGRESS_INTERVAL")
            .env_remove("RUST_LOG");
        cmd
    }
}

use test_utils::*;

#[test]
fn test_help_exits_with_usage_code() {
    let dir = TempDir::new().unwrap();
    bff(dir.path())
        .arg("--help")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("--input"))
        .stdout(predicate::str::contains("--output"));
}

#[test]
fn test_missing_arguments_print_usage() {
    let dir = TempDir::new().unwrap();
    bff(dir.path())
        .args(["--in", "capture.ts"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--output"));
    bff(dir.path()).assert().code(1);
}

#[test]
fn test_unknown_flag_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    bff(dir.path())
        .args(["-i", "a.ts", "-o", "b.mp4", "--crf", "20"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_input_fails_with_libav_error() {
    let dir = TempDir::new().unwrap();
    let output = bff(dir.path())
        .args(["-i", "does-not-exist.ts", "-o", "out.mp4"])
        .output()
        .unwrap();

    let code = output.status.code().unwrap();
    assert_ne!(code, 0);
    assert_ne!(code, 1);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("avformat_open_input(does-not-exist.ts) failed"), "{}", stderr);
}

#[test]
fn test_existing_output_survives_unopenable_input() {
    let dir = TempDir::new().unwrap();
    let stale = dir.path().join("out.mp4");
    std::fs::write(&stale, b"stale").unwrap();

    bff(dir.path())
        .args(["-i", "does-not-exist.ts", "-o", "out.mp4"])
        .assert()
        .failure();
    assert_eq!(std::fs::read(&stale).unwrap(), b"stale");

    std::fs::write(dir.path().join("notes.txt"), b"not a media file").unwrap();
    bff(dir.path())
        .args(["-i", "notes.txt", "-o", "out.mp4"])
        .assert()
        .failure();
    assert_eq!(std::fs::read(&stale).unwrap(), b"stale");
}

#[test]
fn test_existing_output_replaced_when_input_opens() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.mkv");

    if !create_test_video(&input) {
        println!("Skipping output replacement test - ffmpeg with libx264/aac not available");
        return;
    }

    let output = dir.path().join("out.mp4");
    std::fs::write(&output, b"stale").unwrap();
    bff(dir.path())
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists and will be deleted"));

    let written = std::fs::read(&output).unwrap();
    assert_ne!(written, b"stale");
    assert!(written.len() > 1000);
}

#[test]
fn test_invalid_classifier_override_exits_with_generic_failure() {
    let dir = TempDir::new().unwrap();
    bff(dir.path())
        .env("BFF_CLASSIFIER", "brightest")
        .args(["-i", "a.ts", "-o", "b.mp4"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("BFF_CLASSIFIER"));
}

#[test]
fn test_invalid_config_file_exits_with_generic_failure() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("bff.toml"), "[pipeline]\nprogress_interval = 0\n").unwrap();
    bff(dir.path())
        .args(["-i", "a.ts", "-o", "b.mp4"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_real_video_transcode() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.mkv");

    if !create_test_video(&input) {
        println!("Skipping real video transcode test - ffmpeg with libx264/aac not available");
        return;
    }

    for classifier in ["proportional", "statistical"] {
        let output = dir.path().join(format!("{}.mp4", classifier));
        bff(dir.path())
            .env("BFF_CLASSIFIER", classifier)
            .env("BFF_LOG_LEVEL", "info")
            .arg("--in")
            .arg(&input)
            .arg("--out")
            .arg(&output)
            .assert()
            .success()
            .stdout(predicate::str::contains("processed 60 video"))
            .stdout(predicate::str::contains("substituted 10 black frames"));

        let metadata = std::fs::metadata(&output).unwrap();
        assert!(metadata.len() > 1000, "output too small: {} bytes", metadata.len());
    }
}

#[test]
fn test_real_video_without_deinterlacing() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.mkv");

    if !create_test_video(&input) {
        println!("Skipping deinterlace-off test - ffmpeg with libx264/aac not available");
        return;
    }

    let output = dir.path().join("progressive.mp4");
    bff(dir.path())
        .env("BFF_DEINTERLACE", "false")
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();
    assert!(output.exists());
}
