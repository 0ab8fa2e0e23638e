//! Frame <-> timecode conversion.
//!
//! Frames are the timeline's unit; these helpers render them for display and
//! parse user input back. Parsers return `None` for malformed text.

fn whole_fps(fps: f64) -> i64 {
    (fps.round() as i64).max(1)
}

fn split_hms(frame: i64, fps: f64) -> (i64, i64, i64) {
    let secs = frame / whole_fps(fps);
    (secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Format a frame as `HH:MM:SS:FF`.
pub fn format_time_code(frame: i64, fps: f64) -> String {
    let (hours, minutes, seconds) = split_hms(frame, fps);
    let frames = frame % whole_fps(fps);
    format!("{:02}:{:02}:{:02}:{:02}", hours, minutes, seconds, frames)
}

/// Format a frame as `HH:MM:SS:mmm`, or `HH:MM:SS` without milliseconds.
pub fn format_time_string(frame: i64, fps: f64, keep_msecs: bool) -> String {
    let (hours, minutes, seconds) = split_hms(frame, fps);
    if keep_msecs {
        let msecs = ((frame % whole_fps(fps)) as f64 * (1000.0 / fps)) as i64;
        return format!("{:02}:{:02}:{:02}:{:03}", hours, minutes, seconds, msecs);
    }
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

fn parse_fields(text: &str, expected: usize) -> Option<Vec<i64>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let fields = text
        .split(':')
        .map(|part| part.trim().parse::<i64>().ok().filter(|field| *field >= 0))
        .collect::<Option<Vec<_>>>()?;
    (fields.len() == expected).then_some(fields)
}

fn seconds_of(fields: &[i64]) -> Option<i64> {
    fields[0]
        .checked_mul(3600)?
        .checked_add(fields[1].checked_mul(60)?)?
        .checked_add(fields[2])
}

/// Round down to a frame, or `None` past the frame range.
fn to_frame(frames: f64) -> Option<i64> {
    (frames.is_finite() && frames < i64::MAX as f64).then(|| frames as i64)
}

/// Parse `HH:MM:SS:FF` back into a frame number.
pub fn parse_time_code(text: &str, fps: f64) -> Option<i64> {
    let fields = parse_fields(text, 4)?;
    to_frame(seconds_of(&fields)? as f64 * fps)?.checked_add(fields[3])
}

/// Parse `HH:MM:SS:mmm` (or `HH:MM:SS`) back into a frame number.
pub fn parse_time_string(text: &str, fps: f64, keep_msecs: bool) -> Option<i64> {
    let fields = parse_fields(text, if keep_msecs { 4 } else { 3 })?;
    let msecs = if keep_msecs { fields[3] } else { 0 };
    to_frame(seconds_of(&fields)? as f64 * fps + msecs as f64 * fps / 1000.0)
}

/// Wall-clock position of a frame in milliseconds.
pub fn frame_to_millis(frame: i64, fps: f64) -> i64 {
    if fps <= 0.0 {
        return 0;
    }
    (frame as f64 / fps * 1000.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time_code() {
        assert_eq!(format_time_code(0, 30.0), "00:00:00:00");
        assert_eq!(format_time_code(3 * 3600 * 30 + 61 * 30 + 7, 30.0), "03:01:01:07");
    }

    #[test]
    fn test_format_time_string() {
        assert_eq!(format_time_string(37, 25.0, true), "00:00:01:480");
        assert_eq!(format_time_string(37, 25.0, false), "00:00:01");
    }

    #[test]
    fn test_parse_time_code() {
        assert_eq!(parse_time_code("00:01:00:05", 25.0), Some(1505));
        assert_eq!(parse_time_code("00:01:00", 25.0), None);
        assert_eq!(parse_time_code("aa:01:00:05", 25.0), None);
        assert_eq!(parse_time_code("", 25.0), None);
    }

    #[test]
    fn test_parse_time_string() {
        assert_eq!(parse_time_string("00:00:02:500", 30.0, true), Some(75));
        assert_eq!(parse_time_string("00:00:02", 30.0, false), Some(60));
        assert_eq!(parse_time_string("00:00:02", 30.0, true), None);
    }

    #[test]
    fn test_parse_rejects_negative_and_oversized_fields() {
        assert_eq!(parse_time_code("9999999999999999:00:00:00", 30.0), None);
        assert_eq!(parse_time_code("00:00:00:9223372036854775807", 30.0), Some(i64::MAX));
        assert_eq!(parse_time_code("00:00:01:9223372036854775807", 30.0), None);
        assert_eq!(parse_time_code("00:-01:00:00", 30.0), None);
        assert_eq!(parse_time_code("00:00:00:-5", 30.0), None);
        assert_eq!(parse_time_string("9999999999999999:00:00", 30.0, false), None);
        assert_eq!(parse_time_string("-1:00:00:000", 30.0, true), None);
        assert_eq!(parse_time_string("00:00:02:-500", 30.0, true), None);
    }

    #[test]
    fn test_time_code_round_trip_at_integer_fps() {
        let text = format_time_code(98_765, 24.0);
        assert_eq!(parse_time_code(&text, 24.0), Some(98_765));
    }

    #[test]
    fn test_frame_to_millis() {
        assert_eq!(frame_to_millis(90, 30.0), 3000);
        assert_eq!(frame_to_millis(1, 0.0), 0);
    }
}
