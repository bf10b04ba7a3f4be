use crate::error::Result;
use crate::srt::Subtitle;

use std::io::{BufWriter, Write};
use std::time::Duration;

pub fn serialise<W: Write>(subs: &[Subtitle], dst: W) -> Result<()> {
    let mut writer = BufWriter::new(dst);
    write_subs(&mut writer, subs)?;
    writer.flush()?;
    Ok(())
}

fn write_subs<W: Write>(buf: &mut W, subs: &[Subtitle]) -> Result<()> {
    for (i, sub) in subs.iter().enumerate() {
        write_sub(buf, sub, i + 1)?;
    }
    Ok(())
}

fn write_sub<W: Write>(buf: &mut W, sub: &Subtitle, fallback_seqnum: usize) -> Result<()> {
    writeln!(buf, "{}", sub.sequence_number.unwrap_or(fallback_seqnum))?;
    write_ts(buf, sub.show_at)?;
    write!(buf, " --> ")?;
    write_ts(buf, sub.hide_at)?;
    writeln!(buf)?;
    for line in &sub.text {
        writeln!(buf, "{}", line)?;
    }
    writeln!(buf)?;
    Ok(())
}

fn write_ts<W: Write>(buf: &mut W, timestamp: Duration) -> Result<()> {
    let total_secs = timestamp.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = timestamp.as_millis() % 1000;
    write!(
        buf,
        "{:02}:{:02}:{:02},{:03}",
        hours, minutes, seconds, millis
    )?;
    Ok(())
}
