//! Turns playlist videos into quiz questions by extracting answer keys from their titles.
//!
//! Titles follow the naming conventions of horse-racing uploads, e.g.
//! `2024年有馬記念｜タイトルホルダー｜JRA公式`: a dated race, the horse between pipes and the
//! uploader. The extraction is a set of hand-written scanners over the title's chars.

use rand::Rng;
use tracing::warn;

use crate::services::video_provider::VideoInfo;

const EVENT_SUFFIXES: [&str; 5] = ["記念", "杯", "賞", "ステークス", "特別"];
const GRADED_EVENT_SUFFIXES: [&str; 4] = ["記念", "杯", "賞", "ステークス"];
const ORGANIZATIONS: [&str; 8] = [
    "JRA公式",
    "JRA",
    "netkeiba",
    "ウマ娘",
    "UMAJO",
    "グリーンチャンネル",
    "フジテレビ",
    "NHK",
];
const KATAKANA_STOPLIST: [&str; 8] = [
    "レース",
    "ダービー",
    "オークス",
    "スプリント",
    "マイル",
    "ステークス",
    "ハンデ",
    "アナウンス",
];
const MIN_DATED_EVENT_CHARS: usize = 4;
const MIN_PIPE_TOKEN_CHARS: usize = 2;
const KATAKANA_RUN_CHARS: std::ops::RangeInclusive<usize> = 3..=12;
/// Videos this short always start at the beginning.
const SHORT_VIDEO_SECS: u32 = 15;
/// Trailing part of a video never picked as a start point.
const TRAILING_MARGIN_SECS: u32 = 30;

/// Question produced from a single video, before it is attached to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    /// External video identifier.
    pub video_id: String,
    /// Title the answers were extracted from.
    pub video_title: String,
    /// Index of the video in the input list.
    pub question_order: usize,
    /// Extracted answers, longest first.
    pub correct_answers: Vec<String>,
    /// Start offset (seconds) for the audio-only stage.
    pub audio_start_time: u32,
    /// Start offset (seconds) for the video stage.
    pub video_start_time: u32,
}

/// Build one draft per video that yields at least one answer.
///
/// Videos without any extractable answer are skipped; an empty result is for the caller to
/// reject.
pub fn generate<R: Rng + ?Sized>(videos: &[VideoInfo], rng: &mut R) -> Vec<QuestionDraft> {
    videos
        .iter()
        .enumerate()
        .filter_map(|(index, video)| {
            let correct_answers = extract_answers(&video.title);
            if correct_answers.is_empty() {
                warn!(
                    video_id = %video.video_id,
                    title = %video.title,
                    "no answer extracted; skipping video"
                );
                return None;
            }
            Some(QuestionDraft {
                video_id: video.video_id.clone(),
                video_title: video.title.clone(),
                question_order: index,
                correct_answers,
                audio_start_time: random_start_time(video.duration_secs, rng),
                video_start_time: random_start_time(video.duration_secs, rng),
            })
        })
        .collect()
}

/// Extract candidate answers from a video title, deduplicated and sorted longest first.
pub fn extract_answers(title: &str) -> Vec<String> {
    let chars: Vec<char> = title.chars().collect();
    let mut answers = Vec::new();

    for require_nen in [true, false] {
        answers.extend(
            dated_events(&chars, require_nen)
                .into_iter()
                .filter(|event| event.chars().count() >= MIN_DATED_EVENT_CHARS),
        );
    }
    answers.extend(pipe_tokens(&chars).into_iter().filter(|token| {
        token.chars().count() >= MIN_PIPE_TOKEN_CHARS && !is_organization(token)
    }));
    answers.extend(katakana_runs(&chars).into_iter().filter(|run| {
        KATAKANA_RUN_CHARS.contains(&run.chars().count())
            && !KATAKANA_STOPLIST.contains(&run.as_str())
    }));
    answers.extend(graded_events(&chars));

    let mut unique: Vec<String> = Vec::with_capacity(answers.len());
    for answer in answers {
        if !unique.contains(&answer) {
            unique.push(answer);
        }
    }
    unique.sort_by_key(|answer| std::cmp::Reverse(answer.chars().count()));
    unique
}

/// Uniform start offset leaving [`TRAILING_MARGIN_SECS`] before the end of the video.
pub fn random_start_time<R: Rng + ?Sized>(duration_secs: u32, rng: &mut R) -> u32 {
    if duration_secs <= SHORT_VIDEO_SECS {
        return 0;
    }
    let max_start = duration_secs.saturating_sub(TRAILING_MARGIN_SECS);
    rng.random_range(0..=max_start)
}

/// Extract the video id from the usual YouTube URL shapes.
pub fn extract_video_id(url: &str) -> Option<String> {
    const MARKERS: [&str; 4] = [
        "youtube.com/watch?v=",
        "youtu.be/",
        "youtube.com/embed/",
        "youtube.com/v/",
    ];

    MARKERS.iter().find_map(|marker| {
        let start = url.find(marker)? + marker.len();
        let id: String = url[start..]
            .chars()
            .take_while(|c| !matches!(c, '&' | '\n' | '?' | '#'))
            .collect();
        (!id.is_empty()).then_some(id)
    })
}

/// Video id of a playlist entry given either as a bare id or as a YouTube URL.
pub fn resolve_video_reference(reference: &str) -> Option<String> {
    let reference = reference.trim();
    let bare = reference.len() == 11
        && reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare {
        return Some(reference.to_owned());
    }
    extract_video_id(reference)
}

/// Drop bracketed decorations such as `【MV】` or `[4K]` and collapse whitespace.
pub fn clean_video_title(title: &str) -> String {
    let chars: Vec<char> = title.chars().collect();
    let mut cleaned = String::with_capacity(title.len());
    let mut index = 0;

    while index < chars.len() {
        let closing = match chars[index] {
            '【' => Some('】'),
            '[' => Some(']'),
            _ => None,
        };
        // An unterminated bracket is kept verbatim.
        let skip_to = closing.and_then(|end| {
            chars[index + 1..]
                .iter()
                .position(|c| *c == end)
                .map(|offset| index + offset + 2)
        });
        match skip_to {
            Some(next) => index = next,
            None => {
                cleaned.push(chars[index]);
                index += 1;
            }
        }
    }

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Thumbnail resolutions published for every YouTube video.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThumbnailQuality {
    /// 120x90.
    Default,
    /// 320x180.
    #[default]
    Medium,
    /// 480x360.
    High,
    /// 640x480.
    Standard,
    /// Original resolution.
    Maxres,
}

/// Thumbnail URL of a video at the given quality.
pub fn thumbnail_url(video_id: &str, quality: ThumbnailQuality) -> String {
    let prefix = match quality {
        ThumbnailQuality::Default => "",
        ThumbnailQuality::Medium => "mq",
        ThumbnailQuality::High => "hq",
        ThumbnailQuality::Standard => "sd",
        ThumbnailQuality::Maxres => "maxres",
    };
    format!("https://img.youtube.com/vi/{video_id}/{prefix}default.jpg")
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || is_pipe(c)
}

fn is_pipe(c: char) -> bool {
    c == '|' || c == '｜'
}

fn is_katakana(c: char) -> bool {
    ('\u{30A0}'..='\u{30FF}').contains(&c)
}

fn is_organization(token: &str) -> bool {
    ORGANIZATIONS.iter().any(|org| token.contains(org))
}

fn ends_with(chars: &[char], end: usize, suffix: &str) -> Option<usize> {
    let suffix: Vec<char> = suffix.chars().collect();
    let start = end.checked_sub(suffix.len())?;
    (chars[start..end] == suffix[..]).then_some(start)
}

/// Largest `end` in `(run_start, run_end]` such that `chars[run_start..end]` is at least one
/// char followed by one of `suffixes`.
fn last_suffix_end(
    chars: &[char],
    run_start: usize,
    run_end: usize,
    suffixes: &[&str],
) -> Option<usize> {
    (run_start + 1..=run_end).rev().find(|&end| {
        suffixes
            .iter()
            .any(|suffix| matches!(ends_with(chars, end, suffix), Some(start) if start > run_start))
    })
}

fn skip_whitespace(chars: &[char], mut index: usize) -> usize {
    while index < chars.len() && chars[index].is_whitespace() {
        index += 1;
    }
    index
}

fn run_end(chars: &[char], start: usize) -> usize {
    let mut index = start;
    while index < chars.len() && !is_delimiter(chars[index]) {
        index += 1;
    }
    index
}

/// Four digits, optionally `年`, optional whitespace, then a name ending in an event suffix.
fn dated_events(chars: &[char], require_nen: bool) -> Vec<String> {
    let mut found = Vec::new();
    let mut pos = 0;

    while pos + 4 <= chars.len() {
        if !chars[pos..pos + 4].iter().all(char::is_ascii_digit) {
            pos += 1;
            continue;
        }
        let mut cursor = pos + 4;
        if require_nen {
            if chars.get(cursor) != Some(&'年') {
                pos += 1;
                continue;
            }
            cursor += 1;
        }
        let name_start = skip_whitespace(chars, cursor);
        let name_end = run_end(chars, name_start);
        match last_suffix_end(chars, name_start, name_end, &EVENT_SUFFIXES) {
            Some(end) => {
                found.push(
                    chars[pos..end]
                        .iter()
                        .filter(|c| !c.is_whitespace())
                        .collect(),
                );
                pos = end;
            }
            None => pos += 1,
        }
    }

    found
}

/// Tokens enclosed between two pipes; the closing pipe is consumed by the match.
fn pipe_tokens(chars: &[char]) -> Vec<String> {
    let mut found = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        if !is_pipe(chars[pos]) {
            pos += 1;
            continue;
        }
        let start = skip_whitespace(chars, pos + 1);
        let end = run_end(chars, start);
        let close = skip_whitespace(chars, end);
        if end > start && close < chars.len() && is_pipe(chars[close]) {
            found.push(chars[start..end].iter().collect());
            pos = close + 1;
        } else {
            pos += 1;
        }
    }

    found
}

/// Maximal runs of at least three katakana.
fn katakana_runs(chars: &[char]) -> Vec<String> {
    chars
        .split(|c| !is_katakana(*c))
        .filter(|run| run.len() >= *KATAKANA_RUN_CHARS.start())
        .map(|run| run.iter().collect())
        .collect()
}

/// Event names directly followed by a `（G1）`-style grade annotation.
fn graded_events(chars: &[char]) -> Vec<String> {
    let mut found = Vec::new();
    let mut consumed = 0;

    for open in 0..chars.len() {
        let Some(close) = grade_annotation_end(chars, open) else {
            continue;
        };
        let mut end = open;
        while end > consumed && chars[end - 1].is_whitespace() {
            end -= 1;
        }
        let mut start = end;
        while start > consumed && !is_delimiter(chars[start - 1]) {
            start -= 1;
        }
        let named = last_suffix_end(chars, start, end, &GRADED_EVENT_SUFFIXES);
        if named == Some(end) {
            found.push(chars[start..end].iter().collect());
            consumed = close;
        }
    }

    found
}

/// End index (exclusive) of a grade annotation starting at `open`.
fn grade_annotation_end(chars: &[char], open: usize) -> Option<usize> {
    let closing = match chars.get(open)? {
        '（' => '）',
        '(' => ')',
        _ => return None,
    };
    let grade = chars.get(open + 1..open + 4)?;
    let valid = grade[0] == 'G' && matches!(grade[1], '1' | '2' | '3') && grade[2] == closing;
    valid.then_some(open + 4)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn video(id: &str, title: &str, duration_secs: u32) -> VideoInfo {
        VideoInfo {
            video_id: id.into(),
            title: title.into(),
            duration_secs,
            thumbnail_url: None,
        }
    }

    #[test]
    fn dated_race_and_pipe_token_are_extracted_without_organization() {
        let answers = extract_answers("2024年有馬記念｜タイトルホルダー｜JRA公式");
        assert!(answers.contains(&"2024年有馬記念".to_string()));
        assert!(answers.contains(&"タイトルホルダー".to_string()));
        assert!(!answers.iter().any(|answer| answer.contains("JRA")));
    }

    #[test]
    fn answers_are_unique_and_longest_first() {
        let answers = extract_answers("2023年 ジャパンカップ | イクイノックス | netkeiba");
        let unique: HashSet<&String> = answers.iter().collect();
        assert_eq!(unique.len(), answers.len());
        assert!(
            answers
                .windows(2)
                .all(|pair| pair[0].chars().count() >= pair[1].chars().count())
        );
        assert!(answers.contains(&"イクイノックス".to_string()));
        assert!(answers.contains(&"ジャパンカップ".to_string()));
    }

    #[test]
    fn dated_event_with_space_is_joined() {
        let answers = extract_answers("2019 天皇賞 秋");
        assert_eq!(answers, vec!["2019天皇賞".to_string()]);
    }

    #[test]
    fn katakana_stoplist_and_length_bounds_apply() {
        assert!(extract_answers("ダービー").is_empty());
        assert!(extract_answers("マイル レース").is_empty());
        assert!(extract_answers("アイウエオカキクケコサシス").is_empty());
        assert_eq!(extract_answers("ドウデュース"), vec!["ドウデュース".to_string()]);
    }

    #[test]
    fn graded_event_is_extracted() {
        let answers = extract_answers("宝塚記念（G1）");
        assert_eq!(answers, vec!["宝塚記念".to_string()]);
        let answers = extract_answers("中山金杯 (G3)");
        assert_eq!(answers, vec!["中山金杯".to_string()]);
    }

    #[test]
    fn unrecognised_title_yields_nothing() {
        assert!(extract_answers("funny cat compilation").is_empty());
        assert!(extract_answers("").is_empty());
    }

    #[test]
    fn generate_skips_unusable_videos_and_keeps_input_order() {
        let mut rng = StdRng::seed_from_u64(7);
        let videos = [
            video("a", "no answer here", 120),
            video("b", "2024年有馬記念｜タイトルホルダー｜JRA公式", 120),
            video("c", "キタサンブラック", 120),
        ];
        let drafts = generate(&videos, &mut rng);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].video_id, "b");
        assert_eq!(drafts[0].question_order, 1);
        assert_eq!(drafts[1].question_order, 2);
        assert!(drafts.iter().all(|draft| !draft.correct_answers.is_empty()));
    }

    #[test]
    fn generate_with_only_unusable_videos_is_empty() {
        let mut rng = StdRng::seed_from_u64(7);
        let videos = [video("a", "vlog", 60), video("b", "live", 60)];
        assert!(generate(&videos, &mut rng).is_empty());
    }

    #[test]
    fn short_videos_start_at_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        for duration in [0, 10, 15, 20, 30] {
            assert_eq!(random_start_time(duration, &mut rng), 0, "{duration}");
        }
    }

    #[test]
    fn start_offsets_stay_within_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let offsets: Vec<u32> = (0..500).map(|_| random_start_time(100, &mut rng)).collect();
        assert!(offsets.iter().all(|offset| *offset <= 70));
        assert!(offsets.iter().any(|offset| *offset > 35));
    }

    #[test]
    fn video_id_is_extracted_from_common_urls() {
        let urls = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10",
            "https://youtu.be/dQw4w9WgXcQ?si=abc",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ#frag",
        ];
        for url in urls {
            assert_eq!(extract_video_id(url).as_deref(), Some("dQw4w9WgXcQ"), "{url}");
        }
        assert_eq!(extract_video_id("https://example.com/video"), None);
    }

    #[test]
    fn video_reference_accepts_bare_ids_and_urls() {
        assert_eq!(
            resolve_video_reference(" dQw4w9WgXcQ ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            resolve_video_reference("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(resolve_video_reference("not a video"), None);
    }

    #[test]
    fn title_cleanup_drops_bracketed_tags() {
        assert_eq!(
            clean_video_title("【公式】 2024年有馬記念  [4K]  ハイライト"),
            "2024年有馬記念 ハイライト"
        );
    }

    #[test]
    fn thumbnail_url_uses_quality_prefix() {
        assert_eq!(
            thumbnail_url("abc", ThumbnailQuality::default()),
            "https://img.youtube.com/vi/abc/mqdefault.jpg"
        );
        assert_eq!(
            thumbnail_url("abc", ThumbnailQuality::Default),
            "https://img.youtube.com/vi/abc/default.jpg"
        );
    }
}
