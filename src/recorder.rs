// ===============================
// src/recorder.rs
// ===============================
//
// JSONL recorder: satu baris per Event (inbound, instruction, note) + ts_ns.
// Flush tiap detik atau tiap FLUSH_EVERY_N_EVENTS; kalau tulis gagal, file
// dibuka ulang sekali lalu event di-drop kalau masih gagal.
//
// ENV: RECORD_FILE=/path/to/events.jsonl (lihat main.rs).
//
use chrono::Utc;
use serde::Serialize;
use std::io;
use std::path::Path;
use tokio::{
    fs::{self, File, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
    sync::mpsc,
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{error, info};

use crate::domain::Event;

const FLUSH_EVERY_N_EVENTS: u32 = 1000;

async fn open_writer(path: &str) -> io::Result<BufWriter<File>> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path).await?;
    Ok(BufWriter::new(file))
}

#[derive(Serialize)]
struct Record<'a> { ts_ns: i64, event: &'a Event }

pub fn encode_line(ev: &Event) -> serde_json::Result<String> {
    let ts_ns = Utc::now().timestamp_nanos_opt().unwrap_or(0);
    let mut line = serde_json::to_string(&Record { ts_ns, event: ev })?;
    line.push('\n');
    Ok(line)
}

struct Recorder {
    path: String,
    writer: BufWriter<File>,
    pending: u32,
}

impl Recorder {
    async fn write(&mut self, line: &str) {
        if let Err(e) = self.writer.write_all(line.as_bytes()).await {
            error!(?e, path = %self.path, "recorder: write failed, reopening");
            match open_writer(&self.path).await {
                Ok(w) => self.writer = w,
                Err(e) => {
                    error!(?e, "recorder: reopen failed, event dropped");
                    return;
                }
            }
            if let Err(e) = self.writer.write_all(line.as_bytes()).await {
                error!(?e, "recorder: write failed after reopen, event dropped");
                return;
            }
        }
        self.pending += 1;
        if self.pending >= FLUSH_EVERY_N_EVENTS {
            self.flush().await;
        }
    }

    async fn flush(&mut self) {
        if let Err(e) = self.writer.flush().await {
            error!(?e, "recorder: flush failed");
        }
        self.pending = 0;
    }
}

pub async fn run(mut rx: mpsc::Receiver<Event>, path: String) {
    let writer = match open_writer(&path).await {
        Ok(w) => w,
        Err(e) => {
            error!(?e, %path, "recorder: open failed, recording disabled");
            return;
        }
    };
    info!(%path, "recorder: started");
    let mut rec = Recorder { path, writer, pending: 0 };

    let mut tick = interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe_ev = rx.recv() => {
                let Some(ev) = maybe_ev else {
                    rec.flush().await;
                    info!("recorder: channel closed, stopped");
                    break;
                };
                match encode_line(&ev) {
                    Ok(line) => rec.write(&line).await,
                    Err(e) => error!(?e, "recorder: serialize error, skip event"),
                }
            }
            _ = tick.tick() => rec.flush().await,
        }
    }
}
