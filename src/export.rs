use crate::error::Result;
use crate::model::{Commute, Session};
use serde::Serialize;
use std::io::Write;

/// Flat row written for each session
#[derive(Debug, Serialize)]
struct SessionRow<'a> {
    id: String,
    commute: &'a str,
    date: String,
    duration_secs: f64,
    mode: &'a str,
}

impl<'a> SessionRow<'a> {
    fn new(commute: &'a Commute, session: &'a Session) -> Self {
        Self {
            id: session.id.to_string(),
            commute: &commute.name,
            date: session.date.to_rfc3339(),
            duration_secs: session.duration_secs,
            mode: session.mode.as_str(),
        }
    }
}

/// Write sessions as CSV with a header row
pub fn write_csv<W: Write>(writer: W, commute: &Commute, sessions: &[Session]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if sessions.is_empty() {
        wtr.write_record(["id", "commute", "date", "duration_secs", "mode"])?;
    }
    for session in sessions {
        wtr.serialize(SessionRow::new(commute, session))?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct CommuteExport<'a> {
    commute: &'a Commute,
    sessions: &'a [Session],
}

/// Write the commute and its sessions as pretty-printed JSON
pub fn write_json<W: Write>(mut writer: W, commute: &Commute, sessions: &[Session]) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, &CommuteExport { commute, sessions })?;
    writeln!(writer)?;
    Ok(())
}
