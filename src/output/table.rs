use unicode_width::UnicodeWidthStr;

use crate::gemini::AnalysisResult;
use crate::ranking::VideoRecord;

/// Format a counter with thousands separators.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Short date from an RFC-3339 publish timestamp.
fn format_date(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| raw.get(..10).unwrap_or(raw).to_string())
}

/// Truncate a string to fit within max_width (respecting unicode width —
/// Korean titles are double-width and would misalign every column).
fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + cw + 3 > max_width {
            result.push_str("...");
            break;
        }
        result.push(ch);
        width += cw;
    }
    result
}

/// Pad to a display width (not a char count) so double-width titles line up.
fn pad(s: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(s);
    if w >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - w))
    }
}

/// Format ranked search results as a table.
pub fn print_video_results(results: &[VideoRecord], keyword: &str) {
    if results.is_empty() {
        println!("No videos found for \"{keyword}\"");
        return;
    }

    println!(
        "{} video{} for \"{}\":\n",
        results.len(),
        if results.len() == 1 { "" } else { "s" },
        keyword
    );

    println!(
        "  {} {} {:>12} {:>12} {:>8}",
        pad("TITLE", 42),
        pad("CHANNEL", 18),
        "VIEWS",
        "SUBS",
        "RATIO"
    );
    println!("  {}", "-".repeat(96));

    for r in results {
        println!(
            "  {} {} {:>12} {:>12} {:>8}",
            pad(&truncate(&r.title, 40), 42),
            pad(&truncate(&r.channel_title, 16), 18),
            format_count(r.view_count),
            format_count(r.subscriber_count),
            format!("{:.2}x", r.efficiency_ratio),
        );
        println!("  id: {}  published: {}\n", r.id, format_date(&r.published_at));
    }
}

/// Format an analysis for `ideaminer analyze`.
pub fn print_analysis(video_title: &str, analysis: &AnalysisResult) {
    println!("Analysis: {video_title}\n");

    println!("Sentiment:");
    println!("  {}\n", analysis.sentiment);

    println!("Audience reaction:");
    for line in analysis.audience_reaction.lines() {
        println!("  {line}");
    }
    println!();

    if !analysis.top_keywords.is_empty() {
        println!("Top keywords:");
        println!("  {}\n", analysis.top_keywords.join(", "));
    }

    println!("Recommended topics:");
    for (i, rec) in analysis.recommendations.iter().enumerate() {
        println!("  {}. {}", i + 1, rec.keyword);
        println!("     {}", rec.description);
    }
}

/// Format a generated script outline.
pub fn print_outline(keyword: &str, outline: &str) {
    println!("Script outline for \"{keyword}\":\n");
    for line in outline.lines() {
        println!("  {line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_formatting_groups_thousands() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(100_000), "100,000");
        assert_eq!(format_count(1_234_567_890), "1,234,567,890");
    }

    #[test]
    fn date_formatting_shortens_rfc3339() {
        assert_eq!(format_date("2025-11-02T09:30:00Z"), "2025-11-02");
        // unparsable input degrades to a prefix, not a panic
        assert_eq!(format_date("not-a-date"), "not-a-date");
    }

    #[test]
    fn truncate_leaves_short_strings_alone() {
        assert_eq!(truncate("short", 40), "short");
    }

    #[test]
    fn truncate_respects_double_width_characters() {
        // each hangul syllable is width 2
        let title = "아주 긴 한국어 영상 제목입니다 정말로 깁니다";
        let cut = truncate(title, 20);
        assert!(cut.ends_with("..."));
        assert!(UnicodeWidthStr::width(cut.as_str()) <= 20);
    }

    #[test]
    fn pad_accounts_for_display_width() {
        // "한글" is 4 columns wide, so 6 spaces reach width 10
        assert_eq!(pad("한글", 10).len(), "한글".len() + 6);
        assert_eq!(UnicodeWidthStr::width(pad("한글", 10).as_str()), 10);
    }
}
