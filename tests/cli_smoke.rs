use std::{
    io::Write as _,
    path::PathBuf,
    process::{Command, Stdio},
};

const SRT: &str = "1\n00:00:01,000 --> 00:00:03,500\nHi there\n\n2\n00:00:04,000 --> 00:00:06,000\nBye\n";

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_lyricframe")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "lyricframe.exe"
            } else {
                "lyricframe"
            });
            p
        })
}

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("cli_smoke").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn cli_frame_writes_png() {
    let dir = scratch("frame");
    let srt = dir.join("lyrics.srt");
    let out = dir.join("out.png");
    std::fs::write(&srt, SRT).unwrap();

    let status = Command::new(exe())
        .args(["frame", "--at", "2.0", "--resolution", "64x36", "--lyrics"])
        .arg(&srt)
        .arg("--out")
        .arg(&out)
        .status()
        .unwrap();

    assert!(status.success());
    let img = image::open(&out).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (64, 36));
    assert_eq!(img.get_pixel(0, 0).0, [18, 20, 28, 255]);
}

#[test]
fn cli_check_normalizes_blocks() {
    let dir = scratch("check");
    let srt = dir.join("in.srt");
    let out = dir.join("out.srt");
    std::fs::write(&srt, format!("garbage\n\n{SRT}").replace('\n', "\r\n")).unwrap();

    let output = Command::new(exe())
        .arg("check")
        .arg("--in")
        .arg(&srt)
        .arg("--out")
        .arg(&out)
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("2 lines, 1 skipped blocks"));
    assert_eq!(std::fs::read_to_string(&out).unwrap(), SRT);
}

#[test]
fn cli_time_writes_srt_from_taps() {
    let dir = scratch("time");
    let sheet = dir.join("sheet.txt");
    let out = dir.join("timed.srt");
    std::fs::write(&sheet, "Hi there\n\nBye\n").unwrap();

    let mut child = Command::new(exe())
        .arg("time")
        .arg("--lyrics")
        .arg(&sheet)
        .arg("--out")
        .arg(&out)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"1\n00:00:04,000\n6\ndone\n")
        .unwrap();
    let status = child.wait().unwrap();

    assert!(status.success());
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "1\n00:00:01,000 --> 00:00:04,000\nHi there\n\n2\n00:00:04,000 --> 00:00:06,000\nBye\n"
    );
}

#[test]
fn cli_time_refuses_incomplete_sessions() {
    let dir = scratch("time_incomplete");
    let sheet = dir.join("sheet.txt");
    let out = dir.join("timed.srt");
    std::fs::write(&sheet, "one\ntwo\n").unwrap();

    let mut child = Command::new(exe())
        .arg("time")
        .arg("--lyrics")
        .arg(&sheet)
        .arg("--out")
        .arg(&out)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"1\ndone\n").unwrap();
    let status = child.wait().unwrap();

    assert!(!status.success());
    assert!(!out.exists());
}

#[test]
fn cli_time_keeps_taps_when_done_comes_early() {
    let dir = scratch("time_early_done");
    let sheet = dir.join("sheet.txt");
    let out = dir.join("timed.srt");
    std::fs::write(&sheet, "one\ntwo\n").unwrap();

    let mut child = Command::new(exe())
        .arg("time")
        .arg("--lyrics")
        .arg(&sheet)
        .arg("--out")
        .arg(&out)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"1\ndone\n3\n6\ndone\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("not finished: lines 2, 3"), "{stdout}");
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "1\n00:00:01,000 --> 00:00:03,000\none\n\n2\n00:00:03,000 --> 00:00:06,000\ntwo\n"
    );
}

#[test]
fn cli_time_abort_writes_nothing() {
    let dir = scratch("time_abort");
    let sheet = dir.join("sheet.txt");
    let out = dir.join("timed.srt");
    std::fs::write(&sheet, "one\n").unwrap();

    let mut child = Command::new(exe())
        .arg("time")
        .arg("--lyrics")
        .arg(&sheet)
        .arg("--out")
        .arg(&out)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"1\ndone\nabort\n2\ndone\n")
        .unwrap();
    let status = child.wait().unwrap();

    assert!(!status.success());
    assert!(!out.exists());
}
