//! Display strings for countdowns and session labels.

/// `m:ss` rendering used by the countdown, the page title and reminder rows.
pub fn format_clock(total_seconds: u64) -> String {
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes}:{seconds:02}")
}

pub fn page_title(total_seconds: u64) -> String {
    format!("{} - PagePause", format_clock(total_seconds))
}

/// Breaks are numbered against `total_sessions - 1`, which may be zero.
pub fn session_label(is_break: bool, current_session: u32, total_sessions: u32) -> String {
    if is_break {
        format!(
            "Break {} of {}",
            current_session,
            total_sessions.saturating_sub(1)
        )
    } else {
        format!("Session {current_session} of {total_sessions}")
    }
}

pub fn breaks_info(breaks: u32) -> String {
    let plural = if breaks == 1 { "" } else { "s" };
    format!("You'll have {breaks} break{plural}.")
}

pub fn minutes_phrase(minutes: u32) -> String {
    let plural = if minutes == 1 { "" } else { "s" };
    format!("{minutes} minute{plural}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_pads_seconds() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(20 * 60), "20:00");
        assert_eq!(page_title(90), "1:30 - PagePause");
    }

    #[test]
    fn break_label_never_underflows() {
        assert_eq!(session_label(true, 1, 0), "Break 1 of 0");
        assert_eq!(session_label(true, 1, 3), "Break 1 of 2");
        assert_eq!(session_label(false, 2, 3), "Session 2 of 3");
    }

    #[test]
    fn pluralisation() {
        assert_eq!(breaks_info(1), "You'll have 1 break.");
        assert_eq!(breaks_info(0), "You'll have 0 breaks.");
        assert_eq!(minutes_phrase(1), "1 minute");
        assert_eq!(minutes_phrase(5), "5 minutes");
    }
}
