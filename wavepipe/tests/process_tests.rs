//! Runs the real binary and drives it with OS signals.

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

const WAIT: Duration = Duration::from_secs(20);

struct Wavepipe {
    child: Child,
    lines: mpsc::Receiver<String>,
    seen: Vec<String>,
}

impl Wavepipe {
    fn spawn(env: &[(&str, &str)]) -> Self {
        let mut command = Command::new(env!("CARGO_BIN_EXE_wavepipe"));
        command
            .env("BIND", "127.0.0.1:0")
            .env("RUST_LOG", "info")
            .env("EXPORT_PROMETHEUS", "false")
            .env_remove("WAVEPIPE_TEST")
            .env_remove("WAVEPIPE_DEBUG")
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        for (key, value) in env {
            command.env(key, value);
        }
        let mut child = command.spawn().expect("spawn wavepipe");

        let stdout = child.stdout.take().expect("piped stdout");
        let (tx, lines) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Self {
            child,
            lines,
            seen: Vec::new(),
        }
    }

    fn wait_for_line(&mut self, needle: &str) {
        loop {
            match self.lines.recv_timeout(WAIT) {
                Ok(line) => {
                    let found = line.contains(needle);
                    self.seen.push(line);
                    if found {
                        return;
                    }
                }
                Err(e) => panic!("no line containing {needle:?} ({e}); saw {:#?}", self.seen),
            }
        }
    }

    fn signal(&self, signal: Signal) {
        let pid = Pid::from_raw(i32::try_from(self.child.id()).expect("pid fits in i32"));
        kill(pid, signal).expect("send signal");
    }

    /// Wait for exit and return the exit code plus everything logged.
    fn finish(mut self) -> (i32, Vec<String>) {
        let status = self.child.wait().expect("wait for wavepipe");
        self.seen.extend(self.lines.iter());
        let code = status
            .code()
            .unwrap_or_else(|| panic!("killed by signal; saw {:#?}", self.seen));
        (code, self.seen)
    }
}

fn logged(lines: &[String], needle: &str) -> bool {
    lines.iter().any(|line| line.contains(needle))
}

#[test]
fn sigint_shuts_down_gracefully() {
    let mut wavepipe = Wavepipe::spawn(&[]);
    wavepipe.wait_for_line("Lifecycle: subsystem running");
    wavepipe.signal(Signal::SIGINT);

    let (code, lines) = wavepipe.finish();
    assert_eq!(code, 0, "{lines:#?}");
    assert!(logged(&lines, "wavepipe: starting..."));
    assert!(logged(&lines, "Lifecycle: caught signal: SIGINT"));
    assert!(logged(&lines, "Lifecycle: graceful shutdown complete"));
    assert!(!logged(&lines, "force halting"));
}

#[test]
fn test_mode_stops_by_itself() {
    let wavepipe = Wavepipe::spawn(&[
        ("WAVEPIPE_TEST", "true"),
        ("WAVEPIPE_TEST_DELAY_SECS", "1"),
    ]);

    let (code, lines) = wavepipe.finish();
    assert_eq!(code, 0, "{lines:#?}");
    assert!(logged(&lines, "Lifecycle: started in test mode, stopping in 1 seconds"));
    assert!(logged(&lines, "Lifecycle: caught signal: test-timer"));
    assert!(logged(&lines, "Lifecycle: graceful shutdown complete"));
}

#[test]
fn failed_start_exits_non_zero_after_signal() {
    let mut wavepipe = Wavepipe::spawn(&[("BIND", "not-an-address")]);
    wavepipe.wait_for_line("Lifecycle: subsystem failed to start");
    wavepipe.signal(Signal::SIGTERM);

    let (code, lines) = wavepipe.finish();
    assert_eq!(code, 2, "{lines:#?}");
    assert!(logged(&lines, "Lifecycle: caught signal: SIGTERM"));
}

#[test]
fn malformed_test_flag_is_rejected() {
    assert_cmd::Command::new(env!("CARGO_BIN_EXE_wavepipe"))
        .env("BIND", "127.0.0.1:0")
        .env("WAVEPIPE_TEST", "sometimes")
        .timeout(WAIT)
        .assert()
        .failure();
}
