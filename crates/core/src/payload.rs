use crate::model::{NowPlayingRecord, PayloadOutcome};
use thiserror::Error;

pub const FIELD_COUNT: usize = 8;

pub const ABSENT_SENTINEL: &str = "?";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("now playing payload has {found} fields, expected at least {FIELD_COUNT}")]
    TooFewFields { found: usize },
    #[error("invalid duration {0:?}, expected mm:ss")]
    InvalidDuration(String),
}

pub fn parse(raw: &str) -> Result<PayloadOutcome, ParseError> {
    if raw.trim().is_empty() {
        return Ok(PayloadOutcome::Empty);
    }

    let lines: Vec<&str> = raw.split('\n').map(str::trim).collect();
    if lines.len() < FIELD_COUNT {
        return Err(ParseError::TooFewFields { found: lines.len() });
    }

    let duration_secs = parse_duration(lines[2])?;

    Ok(PayloadOutcome::Record(NowPlayingRecord {
        title: lines[0].to_string(),
        artist: lines[1].to_string(),
        duration_secs,
        video_link: optional_field(lines[3]),
        channel_link: optional_field(lines[4]),
        cover_image_key: lines[5].to_string(),
        album: optional_field(lines[6]),
        play_count: lines[7].to_string(),
    }))
}

pub fn is_present(field: &str) -> bool {
    !field.is_empty() && field != ABSENT_SENTINEL
}

fn optional_field(field: &str) -> Option<String> {
    is_present(field).then(|| field.to_string())
}

fn parse_duration(value: &str) -> Result<u64, ParseError> {
    let invalid = || ParseError::InvalidDuration(value.to_string());

    let (minutes, seconds) = value.split_once(':').ok_or_else(invalid)?;
    let minutes: u64 = minutes.trim().parse().map_err(|_| invalid())?;
    let seconds: u64 = seconds.trim().parse().map_err(|_| invalid())?;

    minutes
        .checked_mul(60)
        .and_then(|m| m.checked_add(seconds))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::{parse, ParseError};
    use crate::model::PayloadOutcome;

    const VALID: &str = "Song Title\nSome Artist\n3:45\nhttps://youtu.be/abc\n?\ncover_key\nGreatest Hits\n12\n";

    fn record(raw: &str) -> crate::NowPlayingRecord {
        match parse(raw).unwrap() {
            PayloadOutcome::Record(r) => r,
            PayloadOutcome::Empty => panic!("expected a record"),
        }
    }

    #[test]
    fn blank_input_is_empty() {
        assert_eq!(parse("").unwrap(), PayloadOutcome::Empty);
        assert_eq!(parse("   \n").unwrap(), PayloadOutcome::Empty);
    }

    #[test]
    fn seven_lines_is_malformed() {
        let raw = "a\nb\n1:00\n?\n?\nkey\n?";
        assert_eq!(parse(raw), Err(ParseError::TooFewFields { found: 7 }));
    }

    #[test]
    fn extracts_positional_fields() {
        let r = record(VALID);
        assert_eq!(r.title, "Song Title");
        assert_eq!(r.artist, "Some Artist");
        assert_eq!(r.duration_secs, 225);
        assert_eq!(r.video_link.as_deref(), Some("https://youtu.be/abc"));
        assert_eq!(r.channel_link, None);
        assert_eq!(r.cover_image_key, "cover_key");
        assert_eq!(r.album.as_deref(), Some("Greatest Hits"));
        assert_eq!(r.play_count, "12");
    }

    #[test]
    fn trims_fields_and_crlf() {
        let raw = "  Title \r\n Artist\r\n 0:07 \r\n\r\n?\r\nkey\r\n\r\nmany\r\n";
        let r = record(raw);
        assert_eq!(r.title, "Title");
        assert_eq!(r.duration_secs, 7);
        assert_eq!(r.video_link, None);
        assert_eq!(r.album, None);
        assert_eq!(r.play_count, "many");
    }

    #[test]
    fn bad_duration_is_rejected_not_zeroed() {
        for dur in ["", "abc", "3", "3:xx", "-1:30", "1:-5"] {
            let raw = format!("t\na\n{dur}\n?\n?\nk\n?\n1");
            assert_eq!(
                parse(&raw),
                Err(ParseError::InvalidDuration(dur.to_string())),
                "duration {dur:?}"
            );
        }
    }

    #[test]
    fn trailing_newline_counts_as_empty_play_count() {
        let r = record("Title\nArtist\n3:45\n?\n?\ncover\nAlbum\n");
        assert_eq!(r.album.as_deref(), Some("Album"));
        assert_eq!(r.play_count, "");
    }

    #[test]
    fn extra_lines_are_ignored() {
        let raw = format!("{VALID}trailing\nnoise\n");
        assert_eq!(record(&raw).play_count, "12");
    }
}
